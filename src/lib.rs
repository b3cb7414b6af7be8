//! UCSC genome catalog lookups and coordinate liftover.
//!
//! [`catalog::CatalogBuilder`] groups the UCSC genome list by species and
//! answers species/assembly queries; [`liftover::Liftover`] provisions the
//! UCSC `liftOver` tool and chain files and converts single regions between
//! assemblies. Both parse regions through [`domain::Region`].

pub mod catalog;
pub mod config;
pub mod domain;
pub mod error;
pub mod liftover;
pub mod output;
pub mod store;
pub mod tracks;
pub mod ucsc;
