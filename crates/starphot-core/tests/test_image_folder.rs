use image::{ImageBuffer, Luma, Rgb};
use tempfile::TempDir;

use starphot_core::error::StarphotError;
use starphot_core::frame::PixelPlane;
use starphot_core::io::{load_plane, ImageFolderSource};
use starphot_core::source::FrameSource;

fn write_gray16(dir: &TempDir, name: &str, value: u16) {
    let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(12, 8, |x, y| {
        if x == 3 && y == 2 {
            Luma([value.saturating_add(500)])
        } else {
            Luma([value])
        }
    });
    img.save(dir.path().join(name)).unwrap();
}

// ---------------------------------------------------------------------------
// ImageFolderSource
// ---------------------------------------------------------------------------

#[test]
fn test_open_sorts_by_name_and_ignores_other_files() {
    let dir = tempfile::tempdir().unwrap();
    write_gray16(&dir, "b_002.png", 200);
    write_gray16(&dir, "a_001.png", 100);
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

    let source = ImageFolderSource::open(dir.path()).unwrap();
    assert_eq!(source.len(), 2);
    assert_eq!(source.label(0), "a_001.png");
    assert_eq!(source.label(1), "b_002.png");
}

#[test]
fn test_empty_folder_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("readme.md"), "nothing here").unwrap();
    let err = ImageFolderSource::open(dir.path()).unwrap_err();
    assert!(matches!(err, StarphotError::EmptySequence));
}

#[test]
fn test_sixteen_bit_values_kept_native() {
    let dir = tempfile::tempdir().unwrap();
    write_gray16(&dir, "frame.png", 1000);

    let source = ImageFolderSource::open(dir.path()).unwrap();
    let plane = source.load(0).unwrap();
    let PixelPlane::Mono(data) = plane else {
        panic!("expected a mono plane");
    };
    assert_eq!(data.dim(), (8, 12));
    assert_eq!(data[[0, 0]], 1000.0);
    assert_eq!(data[[2, 3]], 1500.0);
}

#[test]
fn test_color_image_becomes_rgb_plane() {
    let dir = tempfile::tempdir().unwrap();
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(6, 4, Rgb([10, 20, 30]));
    let path = dir.path().join("color.png");
    img.save(&path).unwrap();

    let plane = load_plane(&path).unwrap();
    assert!(plane.is_rgb());
    assert_eq!(plane.dim(), (4, 6));
    let PixelPlane::Rgb { red, green, blue } = plane else {
        panic!("expected an RGB plane");
    };
    assert_eq!(red[[1, 1]], 10.0);
    assert_eq!(green[[1, 1]], 20.0);
    assert_eq!(blue[[1, 1]], 30.0);
}

#[test]
fn test_corrupt_file_is_decode_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_gray16(&dir, "a.png", 100);
    std::fs::write(dir.path().join("b.png"), b"definitely not a png").unwrap();

    let source = ImageFolderSource::open(dir.path()).unwrap();
    assert!(source.load(0).is_ok());
    let err = source.load(1).unwrap_err();
    assert!(matches!(err, StarphotError::FrameDecodeFailed { index: 1, .. }));
}

#[test]
fn test_load_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    write_gray16(&dir, "a.png", 100);
    let source = ImageFolderSource::open(dir.path()).unwrap();
    let err = source.load(3).unwrap_err();
    assert!(matches!(
        err,
        StarphotError::FrameIndexOutOfRange { index: 3, total: 1 }
    ));
}
