//! Signed-media resolution and image-set reconciliation.
//!
//! - [`codec`] maps between permanent references and storage keys.
//! - [`resolver`] derives renderable URLs for whole image sets at once.
//! - [`reconciler`] turns an edit of an image set into storage mutations.

pub mod codec;
pub mod reconciler;
pub mod resolver;

pub use codec::{KeyGenerator, build_reference, extract_key, generate_key_at};
pub use reconciler::{ImageSetReconciler, ReconcilePlan, plan};
pub use resolver::ReferenceResolver;
