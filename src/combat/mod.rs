pub mod attack;
pub mod ranged;
pub mod resolution;

pub use attack::{Attack, DamageType, MeleeAttack, Muscle, RangedAttack, Skill};
pub use resolution::{resolve_attack, send_melee_attack};
