// ─── Syntax Installer Core ───
// Client-side orchestration for installing Syntax clients and studio builds.
//
// Architecture:
//   core/
//     executor/  — Named command boundary + native executor
//     catalog/   — Memoized client list, manifests, latest version
//     paths      — Install folder resolution
//     installer/ — Whole-manifest and target-filtered install pipelines
//     progress   — (label, percent) progress sinks
//     studio     — Studio index + install
//     state/     — Settings and process-wide state

pub mod catalog;
pub mod error;
pub mod executor;
pub mod http;
pub mod installer;
pub mod paths;
pub mod progress;
pub mod state;
pub mod studio;
