pub mod detector;
pub mod input;
pub mod output;
pub mod photon;
pub mod profile;
pub mod sample;
pub mod source;
pub mod variation;

mod traits;

pub use detector::{Detector, NoiseModel, ScatteringGeometry};
pub use input::{Input, SimulationSettings};
pub use output::{Output, full_period_resolution, nyquist_pixel_size};
pub use photon::Photon;
pub use profile::{ProfileModel, PulseProfile};
pub use sample::{
    Alignment, MAX_MAP_CELLS, MapGeometry, MapSample, MapSettings, PropagationResult, Sample,
    SampleType, ShotRecord, SphereSample, SphereSettings, SpheroidSample, SpheroidSettings,
};
pub use source::{ShotPulse, Source};
pub use traits::{ParticleShot, ScatteringModel};
pub use variation::{MAX_DRAW_ATTEMPTS, Variation, VariationMode, VariedQuantity};
