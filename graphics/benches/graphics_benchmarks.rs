use criterion::{Criterion, black_box, criterion_group, criterion_main};

use garnet_core::image::{Image, PixelRgba8};
use garnet_graphics::{
    BackendType, Buffer, BufferKind, BufferResource, BufferTarget, DeviceBuilder, OutputTarget,
    RendererBuilder, RendererInput, ShaderHandle, Texture, TextureResource, VertexFormat,
    VertexObject,
};

fn device() -> garnet_graphics::Device {
    DeviceBuilder::new()
        .with_backend(BackendType::Dummy)
        .build()
        .expect("dummy device")
}

fn quad() -> RendererInput {
    RendererInput::new(
        &[
            [-1.0f32, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
        ],
        &[VertexFormat::Float32x3],
    )
    .with_indices_u16(&[0, 1, 2, 0, 2, 3])
}

fn scene_builder(inputs: usize) -> RendererBuilder {
    let mut builder = RendererBuilder::new();
    builder
        .set_shader(ShaderHandle::DEFAULT)
        .set_output(OutputTarget::window(64, 64));
    builder.add_resource(BufferResource::from_slice(BufferKind::Uniform, 0, &[0.0f32; 16]));
    builder.add_resource(TextureResource::from_image(
        0,
        &Image::<PixelRgba8>::new(16, 16),
    ));
    for _ in 0..inputs {
        builder.add_input(quad());
    }
    builder
}

// ---------------------------------------------------------------------------
// Vertex objects
// ---------------------------------------------------------------------------

fn bench_vertex_object_add(c: &mut Criterion) {
    let mut device = device();
    c.bench_function("vertex_object_add_32_distinct", |b| {
        b.iter(|| {
            let ctx = device.context_mut();
            let mut object = VertexObject::new(ctx).unwrap();
            for i in 0..32u8 {
                let buffer = Buffer::from_data(ctx, BufferTarget::Array, &[i; 64]).unwrap();
                object.add(buffer);
            }
            black_box(object.size());
        });
    });
}

fn bench_vertex_object_dedup(c: &mut Criterion) {
    let mut device = device();
    c.bench_function("vertex_object_add_32_duplicates", |b| {
        b.iter(|| {
            let ctx = device.context_mut();
            let mut object = VertexObject::new(ctx).unwrap();
            for _ in 0..32 {
                let buffer = Buffer::from_data(ctx, BufferTarget::Array, &[7u8; 64]).unwrap();
                object.add(buffer);
            }
            black_box(object.size());
        });
    });
}

// ---------------------------------------------------------------------------
// Textures
// ---------------------------------------------------------------------------

fn bench_texture_upload(c: &mut Criterion) {
    let mut device = device();
    let image = Image::<PixelRgba8>::new(256, 256);
    let mut texture = Texture::from_image(device.context(), &image).unwrap();
    c.bench_function("texture_upload_256x256_rgba8", |b| {
        b.iter(|| {
            texture.set_data(device.context_mut(), black_box(&image)).unwrap();
        });
    });
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

fn bench_renderer_create(c: &mut Criterion) {
    let mut device = device();
    let builder = scene_builder(8);
    c.bench_function("renderer_create_8_inputs", |b| {
        b.iter(|| {
            let renderer = device.create_renderer(black_box(&builder)).unwrap();
            black_box(renderer.resource_count());
        });
    });
}

fn bench_renderer_frame(c: &mut Criterion) {
    let mut device = device();
    let mut renderer = device.create_renderer(&scene_builder(64)).unwrap();
    c.bench_function("renderer_frame_64_inputs", |b| {
        b.iter(|| {
            device.render(&mut renderer).unwrap();
        });
    });
    black_box(renderer.frame_count());
}

criterion_group!(
    benches,
    bench_vertex_object_add,
    bench_vertex_object_dedup,
    bench_texture_upload,
    bench_renderer_create,
    bench_renderer_frame,
);
criterion_main!(benches);
