//! Read, edit and write GameCube disc images.
//!
//! An image is made of two fixed-size headers ([`boot::BootHeader`] and
//! [`bi2::BootInfo`]), the [`apploader::Apploader`], the main
//! [`executable::Executable`], the [`fst::FileSystemTable`] describing the
//! disc's file tree, and the file payloads. [`disc::DiscImage`] ties them
//! together and converts between whole images and unpacked directories.

pub mod apploader;
pub mod bi2;
pub mod binary;
pub mod boot;
pub mod disc;
pub mod error;
pub mod executable;
pub mod fst;

pub use disc::{DiscImage, DiscLayout};
pub use fst::{AlignmentRuleset, Entry, EntryKind, FileSystemTable};
