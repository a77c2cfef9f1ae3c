//! In-process protocol layer between the decision core and its collaborators.
//!
//! - `adapters`: traits collaborators implement
//! - `events`: lifecycle event bus shared by the façades
//! - `analysis`, `pattern_memory`: the façades themselves

pub mod adapters;
pub mod analysis;
pub mod events;
pub mod pattern_memory;

pub use adapters::{AnalysisAdapter, PatternMemoryAdapter, RemediationAdapter, VerificationAdapter};
pub use analysis::{AnalysisProtocol, ANALYSIS_CACHE_NAMESPACE, DEFAULT_CACHE_TTL};
pub use events::{EventHandler, ProtocolEvent, ProtocolEventBus, ProtocolEventKind};
pub use pattern_memory::PatternMemoryProtocol;
