// Processing module - offline acceleration to displacement
//
// Components:
// 1. DominantFrequencyEstimator: FFT peak of a series
// 2. AdaptiveBandpassFilter: Butterworth band-pass around that peak
// 3. TrapezoidalIntegrator: cumulative trapezoid rule
// 4. DisplacementEstimator: filter -> integrate, twice
//
// Runs after capture on an immutable series; nothing here touches the
// capture loop.

pub mod bandpass;
pub mod integrate;
pub mod pipeline;
pub mod sink;
pub mod spectrum;

pub use bandpass::{AdaptiveBandpassFilter, BandpassDesign, Biquad, Cutoffs, FilterOutcome};
pub use integrate::TrapezoidalIntegrator;
pub use pipeline::{DisplacementEstimator, DisplacementReport, StageSummary};
pub use sink::{EndpointSink, ResultSink};
pub use spectrum::{DominantFrequency, DominantFrequencyEstimator};
