pub mod image_folder;

pub use image_folder::{load_plane, ImageFolderSource};
