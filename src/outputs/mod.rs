//! Output rendering for the assembled digest.
//!
//! # Submodules
//!
//! - [`card`]: Renders a [`Digest`](crate::models::Digest) as an interactive chat card payload
//!
//! # Payload Structure
//!
//! ```text
//! {"msg_type": "interactive", "card": {
//!     "config":   {"wide_screen_mode": true},
//!     "header":   {"title": {...}, "template": "blue"},
//!     "elements": [stats, trend, classic, papers, blogs, social]
//! }}
//! ```

pub mod card;
