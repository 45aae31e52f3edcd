//! Source image preparation for the track encoder.
//!
//! This module provides functionality for:
//! - Decoding JPEG/PNG images with EXIF orientation applied
//! - Scaling, desaturating and centering a picture on the disc canvas
//!
//! # Examples
//!
//! ```ignore
//! use discpaint_core::prepare::{fit_to_disc, load_image};
//! use discpaint_core::DiscType;
//!
//! let photo = load_image("photo.jpg").unwrap();
//! let disc = fit_to_disc(&photo, DiscType::Cd).unwrap();
//! assert_eq!(disc.width, 3000);
//! ```

mod canvas;
mod load;
mod types;

pub use canvas::{fit_to_disc, usable_radius, DISC_CANVAS_SIZE};
pub use load::{decode_image, load_image};
pub use types::{DiscImage, PrepareError};
