pub mod chromosome;
pub mod statistic;
pub mod track;
pub mod window;

// re-export for cleaner imports
pub use self::chromosome::{Chromosome, ChromosomeCatalog};
pub use self::statistic::Statistic;
pub use self::track::{SourceFormat, Track, TrackSet, TrackSpec};
pub use self::window::{Tiling, Window, Windows, tile};
