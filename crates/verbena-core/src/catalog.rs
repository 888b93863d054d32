//! The fixed image catalog.
//!
//! Filenames are opaque and preserved verbatim (spaces, parentheses and
//! accented characters included); they resolve to files under the photo
//! directory.

use std::path::{Path, PathBuf};

/// Every image shipped with the invitation, as found under `photos/`.
pub const DEFAULT_IMAGES: [&str; 26] = [
    "4055544481f606c6ec99d28f3a72e2a0.jpg",
    "7d2fe4967c357932604df94eac070961.jpg",
    "bbdec40577c89f32f634f7a1f3982623.jpg",
    "cumpleaños-spiderman.gif",
    "d231430e8b4be63a510112fbbb80f223.jpg",
    "d3b035d62e23e3bdcfd329688aed994f.jpg",
    "Estos-son-los-capitulos-de-donde-salieron-los-mejores-memes-de-Los-Simpson.webp",
    "fotonoticia_20210513181308_1200.jpg",
    "Fv8OOrFWAA0LXa7.jpg",
    "images (1).jpeg",
    "images (2).jpeg",
    "images (3).jpeg",
    "images (4).jpeg",
    "images (5).jpeg",
    "images (6).jpeg",
    "images (7).jpeg",
    "images (8).jpeg",
    "images.jpeg",
    "m4r7p5k99yt81.webp",
    "Memes-de-Cumpleanos-1.jpg",
    "que-chingue-su-madre-el-cumpleañero-v0-j5j55ixlktzc1.webp",
    "shrek-funny-pictures-zwlt1e4d8wx8r1pb.jpg",
    "st,small,507x507-pad,600x600,f8f8f8.jpg",
    "The-Office-Michael-Scott-Celebrate.avif",
    "UJ4Y2XSLIRGPXARQ4WNS22RYYI.jpg",
    "x9zb2tkv4ml61.jpg",
];

/// Ordered, immutable list of known image names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCatalog {
    names: Vec<String>,
}

impl ImageCatalog {
    /// Build a catalog from an explicit list of names.
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// All names in catalog order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First catalog entry, used as the deterministic rotation fallback.
    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a name to its on-disk path under `root`.
    pub fn path_for(root: &Path, name: &str) -> PathBuf {
        root.join(name)
    }
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGES.iter().map(|s| s.to_string()).collect())
    }
}
