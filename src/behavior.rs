//! Material behaviour classifiers.
//!
//! Pure data about how materials move, interact and change state. The
//! subsystems consult these instead of hard-coding material lists.

use bitflags::bitflags;

use crate::materials::MaterialId;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BehaviorFlags: u32 {
        // Movement
        const FALLS          = 0x0000_0001;
        const RISES          = 0x0000_0002;
        const FLOWS          = 0x0000_0004;
        const SLIDES         = 0x0000_0008;
        const STATIC         = 0x0000_0010;
        // Interaction
        const FLAMMABLE      = 0x0000_0100;
        const CONDUCTS_HEAT  = 0x0000_0200;
        const CORRODIBLE     = 0x0000_0400;
        const CORROSIVE      = 0x0000_0800;
        const EXTINGUISHES   = 0x0000_1000;
        // State changes
        const MELTS          = 0x0001_0000;
        const FREEZES        = 0x0002_0000;
        const BOILS          = 0x0004_0000;
        const CONDENSES      = 0x0008_0000;
        const BURNS_OUT      = 0x0010_0000;
        // Lifetime
        const DISSIPATES     = 0x0100_0000;
        const SPREADS        = 0x0200_0000;
        const PRODUCES_SMOKE = 0x0400_0000;
        const PRODUCES_HEAT  = 0x0800_0000;
    }
}

pub fn behavior(mat: MaterialId) -> BehaviorFlags {
    use BehaviorFlags as B;
    match mat {
        MaterialId::Empty => B::empty(),
        MaterialId::Sand => B::FALLS | B::SLIDES | B::CONDUCTS_HEAT | B::CORRODIBLE,
        MaterialId::Stone => B::STATIC | B::CONDUCTS_HEAT | B::CORRODIBLE,
        MaterialId::Water => {
            B::FALLS | B::FLOWS | B::CONDUCTS_HEAT | B::FREEZES | B::BOILS | B::EXTINGUISHES
        }
        MaterialId::Wood => B::STATIC | B::FLAMMABLE | B::CONDUCTS_HEAT | B::CORRODIBLE,
        MaterialId::Fire => {
            B::RISES | B::SPREADS | B::PRODUCES_SMOKE | B::PRODUCES_HEAT | B::BURNS_OUT
        }
        MaterialId::Smoke => B::RISES | B::FLOWS | B::DISSIPATES,
        MaterialId::Soil => B::FALLS | B::SLIDES | B::CONDUCTS_HEAT | B::CORRODIBLE,
        MaterialId::Ice => B::STATIC | B::CONDUCTS_HEAT | B::MELTS,
        MaterialId::Steam => B::RISES | B::FLOWS | B::CONDENSES | B::DISSIPATES,
        MaterialId::Ash => B::FALLS | B::SLIDES | B::CONDUCTS_HEAT,
        MaterialId::Acid => B::FALLS | B::FLOWS | B::CORROSIVE | B::CONDUCTS_HEAT,
    }
}

impl MaterialId {
    #[inline]
    pub fn falls(self) -> bool {
        behavior(self).contains(BehaviorFlags::FALLS)
    }

    #[inline]
    pub fn rises(self) -> bool {
        behavior(self).contains(BehaviorFlags::RISES)
    }

    #[inline]
    pub fn flows(self) -> bool {
        behavior(self).contains(BehaviorFlags::FLOWS)
    }

    #[inline]
    pub fn slides(self) -> bool {
        behavior(self).contains(BehaviorFlags::SLIDES)
    }

    #[inline]
    pub fn is_static(self) -> bool {
        behavior(self).contains(BehaviorFlags::STATIC)
    }

    #[inline]
    pub fn is_flammable(self) -> bool {
        behavior(self).contains(BehaviorFlags::FLAMMABLE)
    }

    #[inline]
    pub fn conducts_heat(self) -> bool {
        behavior(self).contains(BehaviorFlags::CONDUCTS_HEAT)
    }

    #[inline]
    pub fn is_corrodible(self) -> bool {
        behavior(self).contains(BehaviorFlags::CORRODIBLE)
    }

    #[inline]
    pub fn is_corrosive(self) -> bool {
        behavior(self).contains(BehaviorFlags::CORROSIVE)
    }

    #[inline]
    pub fn extinguishes(self) -> bool {
        behavior(self).contains(BehaviorFlags::EXTINGUISHES)
    }

    #[inline]
    pub fn can_melt(self) -> bool {
        behavior(self).contains(BehaviorFlags::MELTS)
    }

    #[inline]
    pub fn can_freeze(self) -> bool {
        behavior(self).contains(BehaviorFlags::FREEZES)
    }

    #[inline]
    pub fn can_boil(self) -> bool {
        behavior(self).contains(BehaviorFlags::BOILS)
    }

    #[inline]
    pub fn can_condense(self) -> bool {
        behavior(self).contains(BehaviorFlags::CONDENSES)
    }

    #[inline]
    pub fn dissipates(self) -> bool {
        behavior(self).contains(BehaviorFlags::DISSIPATES)
    }

    #[inline]
    pub fn produces_smoke(self) -> bool {
        behavior(self).contains(BehaviorFlags::PRODUCES_SMOKE)
    }

    #[inline]
    pub fn produces_heat(self) -> bool {
        behavior(self).contains(BehaviorFlags::PRODUCES_HEAT)
    }
}

/// What a material becomes when it crosses a temperature threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransition {
    pub result: MaterialId,
    pub threshold: f32,
    pub probability: f32,
}

pub fn melt_transition(mat: MaterialId) -> Option<StateTransition> {
    match mat {
        MaterialId::Ice => Some(StateTransition {
            result: MaterialId::Water,
            threshold: 0.0,
            probability: 0.01,
        }),
        _ => None,
    }
}

pub fn freeze_transition(mat: MaterialId) -> Option<StateTransition> {
    match mat {
        MaterialId::Water => Some(StateTransition {
            result: MaterialId::Ice,
            threshold: 0.0,
            probability: 0.005,
        }),
        _ => None,
    }
}

pub fn boil_transition(mat: MaterialId) -> Option<StateTransition> {
    match mat {
        MaterialId::Water => Some(StateTransition {
            result: MaterialId::Steam,
            threshold: 100.0,
            probability: 0.02,
        }),
        _ => None,
    }
}

pub fn condense_transition(mat: MaterialId) -> Option<StateTransition> {
    match mat {
        MaterialId::Steam => Some(StateTransition {
            result: MaterialId::Water,
            threshold: 80.0,
            probability: 0.01,
        }),
        _ => None,
    }
}

pub fn burn_transition(mat: MaterialId) -> Option<StateTransition> {
    match mat {
        MaterialId::Wood => Some(StateTransition {
            result: MaterialId::Fire,
            threshold: 300.0,
            probability: 0.03,
        }),
        _ => None,
    }
}

/// An interaction between a source material and a neighbouring target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactionRule {
    pub target: MaterialId,
    pub result_self: MaterialId,
    pub result_target: MaterialId,
    pub probability: f32,
    pub byproduct: MaterialId,
    pub byproduct_chance: f32,
}

/// Corrosion rule for acid against a corrodible target.
pub fn corrosion_reaction(target: MaterialId) -> Option<ReactionRule> {
    if !target.is_corrodible() {
        return None;
    }
    Some(ReactionRule {
        target,
        result_self: MaterialId::Empty,
        result_target: MaterialId::Empty,
        probability: 0.08,
        byproduct: MaterialId::Smoke,
        byproduct_chance: 0.5,
    })
}

pub fn fire_spread_reaction(target: MaterialId) -> Option<ReactionRule> {
    if !target.is_flammable() {
        return None;
    }
    Some(ReactionRule {
        target,
        result_self: MaterialId::Fire,
        result_target: MaterialId::Fire,
        probability: 0.03,
        byproduct: MaterialId::Empty,
        byproduct_chance: 0.0,
    })
}

pub fn extinguish_reaction(source: MaterialId) -> Option<ReactionRule> {
    if !source.extinguishes() {
        return None;
    }
    Some(ReactionRule {
        target: MaterialId::Fire,
        result_self: if source == MaterialId::Water {
            MaterialId::Steam
        } else {
            source
        },
        result_target: MaterialId::Smoke,
        probability: 0.5,
        byproduct: MaterialId::Steam,
        byproduct_chance: 0.3,
    })
}

/// What burnt-out fire leaves behind.
#[derive(Debug, Clone, Copy)]
pub struct FireDeath {
    pub ash: MaterialId,
    pub smoke: MaterialId,
    pub ash_chance: f32,
    pub smoke_chance: f32,
}

pub fn fire_death() -> FireDeath {
    FireDeath {
        ash: MaterialId::Ash,
        smoke: MaterialId::Smoke,
        ash_chance: 0.3,
        smoke_chance: 0.5,
    }
}

/// Movement attempt order for powders: fall, then the down diagonals.
pub const POWDER_MOVE_PRIORITY: [(i32, i32); 3] = [(0, 1), (-1, 1), (1, 1)];

/// Movement attempt order for fluids: fall, sideways, then down diagonals.
pub const FLUID_MOVE_PRIORITY: [(i32, i32); 5] = [(0, 1), (-1, 0), (1, 0), (-1, 1), (1, 1)];

/// Movement attempt order for gases: rise, up diagonals, sideways.
pub const GAS_MOVE_PRIORITY: [(i32, i32); 5] = [(0, -1), (-1, -1), (1, -1), (-1, 0), (1, 0)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_classifiers() {
        assert!(MaterialId::Sand.falls());
        assert!(MaterialId::Sand.slides());
        assert!(!MaterialId::Sand.flows());
        assert!(MaterialId::Water.flows());
        assert!(MaterialId::Smoke.rises());
        assert!(MaterialId::Stone.is_static());
        assert!(!MaterialId::Empty.falls());
    }

    #[test]
    fn interaction_classifiers() {
        assert!(MaterialId::Wood.is_flammable());
        assert!(!MaterialId::Stone.is_flammable());
        assert!(MaterialId::Water.extinguishes());
        assert!(MaterialId::Acid.is_corrosive());
        for corrodible in [
            MaterialId::Stone,
            MaterialId::Wood,
            MaterialId::Sand,
            MaterialId::Soil,
        ] {
            assert!(corrodible.is_corrodible());
        }
        assert!(!MaterialId::Acid.is_corrodible());
    }

    #[test]
    fn transitions_cover_the_water_cycle() {
        assert_eq!(melt_transition(MaterialId::Ice).unwrap().result, MaterialId::Water);
        assert_eq!(freeze_transition(MaterialId::Water).unwrap().result, MaterialId::Ice);
        assert_eq!(boil_transition(MaterialId::Water).unwrap().result, MaterialId::Steam);
        assert_eq!(condense_transition(MaterialId::Steam).unwrap().result, MaterialId::Water);
        assert!(melt_transition(MaterialId::Sand).is_none());
        assert!(boil_transition(MaterialId::Stone).is_none());
    }

    #[test]
    fn corrosion_rule_only_for_corrodible_targets() {
        let rule = corrosion_reaction(MaterialId::Stone).unwrap();
        assert_eq!(rule.byproduct, MaterialId::Smoke);
        assert_eq!(rule.result_target, MaterialId::Empty);
        assert!(corrosion_reaction(MaterialId::Water).is_none());
        assert!(corrosion_reaction(MaterialId::Empty).is_none());
    }

    #[test]
    fn fire_death_split_sums_below_one() {
        let d = fire_death();
        assert!(d.ash_chance + d.smoke_chance < 1.0);
    }
}
