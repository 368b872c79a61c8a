use matte_image::{
    Bounds, FrameBuffers, HeapRequest, ImageError, PixelYca, ScratchHeap, MAX_ALPHA,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[test]
fn test_alpha_channel_tracks_pixels() -> Result<(), ImageError> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut frames = FrameBuffers::new(9, 7);
    let mut expected = vec![0; 6 * 5];
    for y in 0..5 {
        for x in 0..6 {
            let a = rng.random_range(0..=MAX_ALPHA);
            expected[y * 6 + x] = a;
            let px = PixelYca {
                y: x as i16,
                cb: -(y as i16),
                cr: 1,
                a,
            };
            frames.edit_mut().set_pixel(x, y, px);
        }
    }
    let alpha = frames.edit().alpha(6, 5)?;
    for y in 0..5 {
        for x in 0..6 {
            assert_eq!(alpha.get(x, y), expected[y * 6 + x]);
        }
    }
    assert_eq!(frames.edit().pixel(4, 2).y, 4);
    assert_eq!(frames.edit().pixel(4, 2).cb, -2);
    Ok(())
}

#[test]
fn test_plane_over_frame_memory() -> Result<(), ImageError> {
    let mut frames = FrameBuffers::new(4, 4);
    {
        let (_, temp) = frames.split();
        let mut plane = temp.plane_mut(10, 6, 10)?;
        plane.set(9, 5, MAX_ALPHA);
    }
    frames.swap();
    assert_eq!(frames.edit().as_slice()[59], MAX_ALPHA);
    // a plane larger than the frame memory is refused.
    assert!(frames.temp().plane(10, 7, 10).is_err());
    Ok(())
}

#[test]
fn test_sub_view_bounds() -> Result<(), ImageError> {
    let mut frames = FrameBuffers::new(8, 8);
    frames
        .edit_mut()
        .alpha_mut(8, 8)?
        .into_sub_view(Bounds::new(2, 3, 5, 6))?
        .fill(MAX_ALPHA);
    let alpha = frames.edit().alpha(8, 8)?;
    assert_eq!(alpha.get(2, 3), MAX_ALPHA);
    assert_eq!(alpha.get(4, 5), MAX_ALPHA);
    assert_eq!(alpha.get(5, 5), 0);
    assert_eq!(alpha.get(1, 3), 0);
    let view = alpha.sub_view(Bounds::new(2, 3, 5, 6))?;
    assert_eq!((view.width(), view.height()), (3, 3));
    assert!(matches!(
        alpha.sub_view(Bounds::new(6, 6, 9, 7)),
        Err(ImageError::RegionOutOfPlane(..))
    ));
    Ok(())
}

#[test]
fn test_scratch_budget() -> Result<(), ImageError> {
    let mut heap = ScratchHeap::with_capacity(64);
    let req = HeapRequest::new(8, 16, 8);
    assert_eq!(req.bytes(), 64);
    let carved = heap.carve(req)?;
    assert_eq!(
        (carved.words.len(), carved.masks.len(), carved.alphas.len()),
        (8, 16, 8)
    );
    assert_eq!(
        heap.carve(req + HeapRequest::masks(1)).err(),
        Some(ImageError::HeapExhausted(65, 64))
    );
    Ok(())
}
