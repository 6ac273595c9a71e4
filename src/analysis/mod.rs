pub mod boundaries;
pub mod effects;
pub mod level;
pub mod priority;
pub mod root_cause;
pub mod rules;
pub mod stats;

pub use boundaries::{BoundaryBuilder, DimensionBoundaries};
pub use effects::{effect_tone, EffectRecord, EffectTable, EffectTone};
pub use level::{CriticalityLevel, Desirability};
pub use priority::{prioritize, PriorityEntry, PriorityList};
pub use root_cause::{CellValue, Correlation, ImpactMatrix, RootCauseReport};
pub use rules::{classify, CriticalityMap, CriticalityRule, CriticalityRules};
pub use stats::{histogram, pearson, HistogramBin};
