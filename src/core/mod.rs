// Core algorithm exports
pub mod categorizer;
pub mod discovery;
pub mod distance;
pub mod events;
pub mod search;
pub mod session;
pub mod swipe;
pub mod tournament;

pub use categorizer::{CuisineCategorizer, HeuristicCategorizer};
pub use discovery::Discovery;
pub use distance::{build_search_grid, format_distance, haversine_distance};
pub use events::{ChannelSink, DiscoveryEvent, EventEnvelope, EventSink, NoopSink, TracingSink};
pub use search::{fetch_area, run_discovery, FetchLimits, PlaceDeduplicator};
pub use session::{GameSession, GameStage, SessionError};
pub use swipe::SwipeSession;
pub use tournament::{RoundOutcome, Tournament, TournamentError};
