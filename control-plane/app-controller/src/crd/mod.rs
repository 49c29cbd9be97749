pub mod application;

pub use application::{
    Application, ApplicationSpec, ApplicationStatus, ComponentStatus, Condition,
    ConditionStatus, ConditionType, GroupKind, LabelSelector,
    LabelSelectorRequirement, ObjectStatus,
};
