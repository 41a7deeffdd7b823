//! # Cardkit Testkit
//!
//! Testing utilities for cardkit.
//!
//! ## Overview
//!
//! - **Golden vectors**: fixed snapshots, card ids and self signatures
//! - **Generators**: proptest strategies for property-based testing
//! - **Fixtures**: deterministic parties and an in-memory registry
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cardkit_testkit::vectors::{all_vectors, generate_from_vector};
//!
//! for vector in all_vectors() {
//!     let out = generate_from_vector(&vector);
//!     assert_eq!(out.card_id, vector.expected_card_id);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cardkit_testkit::CardSeed;
//!
//! proptest! {
//!     #[test]
//!     fn card_id_is_deterministic(seed: CardSeed) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use std::sync::Arc;
//! use cardkit_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let manager = fixture.manager(Arc::new(fixture.registry()));
//! let model = manager.generate_raw_card(&fixture.owner_params("alice")).unwrap();
//! assert_eq!(model.signatures().len(), 1);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture};
pub use generators::CardSeed;
pub use vectors::{all_vectors, generate_from_vector, verify_all_vectors, GoldenVector};
