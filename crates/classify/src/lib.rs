pub mod rules;

pub use rules::{
    CategoryRule, Classification, Classifier, ExclusionRule, Pattern, RuleSetError,
};
