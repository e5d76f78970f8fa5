//! Integration tests for resources and renderers.
//!
//! Each test runs against every backend in [`common::Backend`]; backends
//! that are not available on the machine are skipped.
//!
//! ```bash
//! cargo test --test renderer_tests
//! cargo test --test renderer_tests --features wgpu-backend
//! ```

mod common;

use rstest::rstest;

use common::{Backend, TestContext, renderer_builder, triangle};
use garnet_core::image::{Image, PixelRgba8};
use garnet_graphics::{
    AttachmentFlags, BufferKind, BufferResource, ClearColor, DataAccess, OutputTarget,
    RenderPassAttachment, ResourceType, Texture, TextureDataDescriptor, TextureResource,
    TextureState, VertexObject,
};

fn pattern(width: u32, height: u32) -> Image<PixelRgba8> {
    let pixels = (0..width * height)
        .map(|i| PixelRgba8::new(i as u8, (i * 3) as u8, 255 - i as u8, 255))
        .collect();
    Image::from_pixels(width, height, pixels)
}

// ============================================================================
// Vertex Objects
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_vertex_object_dedups_equal_buffers(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut object = VertexObject::new(tc.ctx()).unwrap();

    let positions = tc.array_buffer(&[1, 2, 3, 4]);
    let kept = positions.name();
    let duplicate = tc.array_buffer(&[1, 2, 3, 4]);
    let normals = tc.array_buffer(&[5, 6, 7, 8]);

    assert_eq!(object.add(positions), 0);
    assert_eq!(object.add(duplicate), 0);
    assert_eq!(object.add(normals), 1);
    assert_eq!(object.size(), 2);
    assert_eq!(object[0].as_ref().unwrap().name(), kept);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_vertex_object_indices_survive_erase(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut object = VertexObject::new(tc.ctx()).unwrap();
    let names: Vec<_> = (0..4u8)
        .map(|i| {
            let buffer = tc.array_buffer(&[i; 4]);
            let name = buffer.name();
            object.add(buffer);
            name
        })
        .collect();

    object.erase(1);
    let released = object.release(2).unwrap();

    assert_eq!(object.size(), 4);
    assert_eq!(object.element_size(), 2);
    assert_eq!(object.get(0).unwrap().name(), names[0]);
    assert_eq!(object.get(3).unwrap().name(), names[3]);
    assert_eq!(released.read(tc.ctx()).unwrap(), vec![2; 4]);

    // Freed slots are not reused.
    let extra = tc.array_buffer(&[9; 4]);
    assert_eq!(object.add(extra), 4);
}

// ============================================================================
// Textures
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_texture_upload_download(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let image = pattern(5, 3);
    let mut texture = Texture::new(tc.ctx()).unwrap();
    assert_eq!(texture.state(), TextureState::Empty);

    texture.set_data(tc.ctx(), &image).unwrap();
    assert_eq!(texture.state(), TextureState::Sized);
    assert_eq!((texture.width(), texture.height()), (5, 3));

    let read = texture.get_data::<PixelRgba8>(tc.ctx()).unwrap();
    assert_eq!(read, image);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_terminal_handles_are_unique(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let image = pattern(2, 2);
    let mut first = Texture::from_image(tc.ctx(), &image).unwrap();
    let mut second = Texture::from_image(tc.ctx(), &image).unwrap();

    let a = first.make_terminal(tc.ctx()).unwrap();
    let b = second.make_terminal(tc.ctx()).unwrap();
    assert_ne!(a, b);
    assert_eq!(first.state(), TextureState::Terminal);
    assert_eq!(tc.ctx().sentinel().len(), 2);
    assert_eq!(tc.ctx().sentinel().texture_of(b), Some(second.name()));

    drop(first);
    assert_eq!(tc.ctx().sentinel().len(), 1);
    assert_eq!(tc.ctx().sentinel().handle_of(second.name()), Some(b));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_terminal_texture_still_accepts_same_shape_data(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut texture = Texture::from_image(tc.ctx(), &pattern(2, 2)).unwrap();
    let handle = texture.make_terminal(tc.ctx()).unwrap();

    let update = Image::from_pixels(2, 2, vec![PixelRgba8::new(7, 7, 7, 7); 4]);
    texture.set_data(tc.ctx(), &update).unwrap();
    assert_eq!(texture.terminal_handle(), handle);
    assert_eq!(texture.get_data::<PixelRgba8>(tc.ctx()).unwrap(), update);
}

#[test]
#[should_panic(expected = "already terminal")]
fn test_make_terminal_twice_panics() {
    let mut tc = TestContext::new(Backend::Dummy).unwrap();
    let mut texture = Texture::from_image(tc.ctx(), &pattern(2, 2)).unwrap();
    texture.make_terminal(tc.ctx()).unwrap();
    let _ = texture.make_terminal(tc.ctx());
}

#[test]
#[should_panic(expected = "cannot be resized")]
fn test_resize_after_terminal_panics() {
    let mut tc = TestContext::new(Backend::Dummy).unwrap();
    let mut texture = Texture::from_image(tc.ctx(), &pattern(2, 2)).unwrap();
    texture.make_terminal(tc.ctx()).unwrap();
    let _ = texture.resize(tc.ctx(), &TextureDataDescriptor::rgba8(4, 4));
}

// ============================================================================
// Renderers
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_renderer_keeps_resource_values(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let values = [1u32, 2, 3, 4, 5];
    let mut declared = renderer_builder(OutputTarget::window(4, 4));
    let handle = declared.add_resource(BufferResource::from_slice(
        BufferKind::Uniform,
        0,
        &values,
    ));

    let renderer = tc.device.create_renderer(&declared).unwrap();
    let resource = renderer.get_resource(handle).unwrap();
    assert_eq!(resource.resource_type(), ResourceType::Buffer);
    assert_eq!(resource.bytes(), bytemuck::cast_slice::<u32, u8>(&values));
    assert_eq!(renderer.resource_count(), 1);
    assert_eq!(renderer.resource_count_of(ResourceType::Buffer), 1);
    assert_eq!(renderer.resource_count_of(ResourceType::Texture), 0);
    assert_eq!(renderer.input_count(), 0);
    assert_eq!(renderer.input_count_of(DataAccess::StaticFixed), 0);
    assert_eq!(renderer.input_count_of(DataAccess::DynamicFixed), 0);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_renderer_is_isolated_from_builder(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut declared = renderer_builder(OutputTarget::window(4, 4));
    let uniform =
        declared.add_resource(BufferResource::from_slice(BufferKind::Uniform, 0, &[1.0f32; 4]));
    let texture = declared.add_resource(TextureResource::from_image(0, &pattern(2, 2)));
    let input = declared.add_input(triangle());

    let renderer = tc.device.create_renderer(&declared).unwrap();

    declared
        .resource_mut(uniform)
        .and_then(|r| r.as_buffer_mut())
        .unwrap()
        .set_slice(&[9.0f32; 4]);
    declared
        .resource_mut(texture)
        .and_then(|r| r.as_texture_mut())
        .unwrap()
        .set_image(&pattern(3, 3));
    declared
        .input_mut(input)
        .unwrap()
        .set_vertices(bytemuck::cast_slice(&[[0.25f32; 3]; 3]));

    let kept = renderer.get_resource(uniform).unwrap();
    assert_eq!(kept.bytes(), bytemuck::cast_slice::<f32, u8>(&[1.0; 4]));
    assert!(!std::ptr::eq(kept, declared.resource(uniform).unwrap()));
    assert_eq!(
        renderer.get_resource(texture).unwrap().as_texture().unwrap().descriptor().width,
        2
    );
    assert_eq!(renderer.get_input(input).unwrap(), &triangle());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_clear_colour_does_not_touch_counts(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut declared = renderer_builder(OutputTarget::window(4, 4));
    declared.add_resource(BufferResource::from_slice(BufferKind::Uniform, 0, &[0u32; 4]));
    declared.add_input(triangle());

    let mut renderer = tc.device.create_renderer(&declared).unwrap();
    assert_eq!(renderer.clear_colour(), ClearColor::new(0.0, 0.0, 0.0, 0.0));

    renderer.set_clear_colour(ClearColor::WHITE);
    assert_eq!(renderer.clear_colour(), ClearColor::WHITE);
    assert_eq!(renderer.resource_count(), 1);
    assert_eq!(renderer.input_count(), 1);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_offscreen_clear_readback(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut declared = renderer_builder(OutputTarget::offscreen(
        4,
        4,
        AttachmentFlags::COLOUR | AttachmentFlags::DEPTH,
    ));
    declared.set_pass(RenderPassAttachment::ColourDepth);

    let mut renderer = tc.device.create_renderer(&declared).unwrap();
    renderer.set_clear_colour(ClearColor::new(0.0, 0.0, 1.0, 1.0));
    tc.device.render(&mut renderer).unwrap();

    let image = renderer
        .output_texture()
        .unwrap()
        .get_data::<PixelRgba8>(tc.device.context())
        .unwrap();
    assert!(
        image
            .pixels()
            .iter()
            .all(|p| *p == PixelRgba8::new(0, 0, 255, 255))
    );
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_render_many_frames(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut declared = renderer_builder(OutputTarget::window(16, 16));
    declared.add_input(triangle().with_indices_u16(&[0, 1, 2]));
    let dynamic = declared.add_input(triangle().with_access(DataAccess::DynamicFixed));

    let mut renderer = tc.device.create_renderer(&declared).unwrap();
    for frame in 0..10u32 {
        let offset = frame as f32 * 0.01;
        let moved = [[offset, 0.5, 0.0], [-0.5, -0.5, 0.0], [0.5, -0.5, 0.0]];
        renderer
            .update_input(tc.ctx(), dynamic, bytemuck::cast_slice(&moved))
            .unwrap();
        tc.device.render(&mut renderer).unwrap();
    }
    assert_eq!(renderer.frame_count(), 10);
    assert_eq!(renderer.input_count_of(DataAccess::StaticFixed), 1);
    assert_eq!(renderer.input_count_of(DataAccess::DynamicFixed), 1);
}

#[test]
fn test_invalid_renderer_is_rejected() {
    let mut tc = TestContext::new(Backend::Dummy).unwrap();
    let mut declared = renderer_builder(OutputTarget::offscreen(4, 4, AttachmentFlags::COLOUR));
    declared.set_pass(RenderPassAttachment::ColourDepth);
    assert!(tc.device.create_renderer(&declared).is_err());

    let mut declared = renderer_builder(OutputTarget::window(4, 4));
    declared.add_resource(BufferResource::new(BufferKind::Uniform, 1, vec![0u8; 16]));
    declared.add_resource(BufferResource::new(BufferKind::Uniform, 1, vec![0u8; 16]));
    assert!(tc.device.create_renderer(&declared).is_err());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::wgpu(Backend::Wgpu)]
fn test_empty_buffer_resource_is_rejected(#[case] backend: Backend) {
    let Some(mut tc) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut declared = renderer_builder(OutputTarget::window(4, 4));
    declared.add_resource(BufferResource::new(BufferKind::Storage, 0, Vec::<u8>::new()));
    assert!(tc.device.create_renderer(&declared).is_err());
}
