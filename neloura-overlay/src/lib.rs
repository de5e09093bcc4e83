//! Coordinate grid overlay and live cursor readout for the Neloura viewer.
//!
//! Everything hangs off a [`ViewerSession`], one per open image. The host
//! feeds it the FITS header, viewer geometry and events, pointer moves and
//! animation frames; the session answers with canvas commands, readout text
//! and probe requests.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`ticks`] | 1-2-5 tick steps and step-aware labels |
//! | [`sampling`] | Edge sampling of the sky and tick placement |
//! | [`render`] | Border, tick marks and labels |
//! | [`schedule`] | Coalescing, throttled redraw scheduling |
//! | [`readout`] | Pointer readout with pixel value fallbacks |
//! | [`settings`] | Overlay settings and their refresh cache |
//! | [`canvas`] | Drawing surface trait and a recording implementation |
//! | [`viewer`] | The viewer geometry the overlay relies on |
//! | [`session`] | Per-viewer context tying the above together |

pub mod canvas;
pub mod error;
pub mod readout;
pub mod render;
pub mod sampling;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod ticks;
pub mod viewer;

pub use canvas::{CommandCanvas, DrawCommand, OverlayCanvas, TextAlign, TextMetrics};
pub use error::{OverlayError, OverlayResult};
pub use readout::{
    format_pixel_value, LiveReadout, PixelSource, PreviewBuffer, ProbeRequest, ReadoutContext,
    ReadoutText, ReadoutUpdate, ValueSource,
};
pub use render::{FrameSummary, GridRenderer, Tick};
pub use sampling::{invert_samples, sample_edges, tick_values, EdgeSample, EdgeSamples, ImageBounds};
pub use schedule::{RedrawScheduler, RedrawState};
pub use session::{SessionEvent, ViewerSession, WCS_READY_EVENTS};
pub use settings::{LabelMode, OverlaySettings, RefreshTicket, SettingsCache, SettingsDelta};
pub use ticks::{choose_step, format_dec, format_ra, TickPlanner};
pub use viewer::{PanZoomViewer, ScreenPoint, ViewerEvent, ViewerGeometry, ViewportSize};
