//! Resource storage and transfers for the wgpu backend.

use wgpu::util::DeviceExt;

use crate::error::GraphicsError;
use crate::types::TextureDataDescriptor;

use super::conversion::{convert_buffer_usage, convert_texture_format};
use super::{TextureStorage, WgpuBackend, WgpuBuffer};
use crate::backend::BufferName;

/// Aspect copied for `format`: depth formats copy their depth plane.
pub(super) fn copy_aspect(format: wgpu::TextureFormat) -> wgpu::TextureAspect {
    if format.is_depth_stencil_format() {
        wgpu::TextureAspect::DepthOnly
    } else {
        wgpu::TextureAspect::All
    }
}

impl WgpuBackend {
    /// Replace a buffer's store with a new wgpu buffer holding `data`.
    pub(super) fn replace_buffer_store(&self, name: BufferName, entry: &mut WgpuBuffer, data: &[u8]) {
        if let Some(old) = entry.buffer.take() {
            old.destroy();
        }
        entry.len = data.len();
        if data.is_empty() {
            log::trace!("WgpuBackend: {} emptied", name);
            return;
        }
        // Copies work in 4-byte units, so the store is padded.
        let mut contents = data.to_vec();
        contents.resize(data.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
        let label = name.to_string();
        entry.buffer = Some(
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: &contents,
                    usage: convert_buffer_usage(entry.target),
                }),
        );
        log::trace!("WgpuBackend: wrote {} bytes to {}", data.len(), name);
    }

    /// Copy a buffer into a staging buffer and read back its first `len` bytes.
    pub(super) fn read_buffer_store(
        &self,
        buffer: &wgpu::Buffer,
        len: usize,
    ) -> Result<Vec<u8>, GraphicsError> {
        let size = buffer.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Read Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Read Buffer Encoder"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        let idx = self.queue.submit(std::iter::once(encoder.finish()));
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(idx),
            timeout: Some(std::time::Duration::from_secs(10)),
        });

        let mut data = map_staging(self, &staging)?;
        data.truncate(len);
        Ok(data)
    }

    /// Create a texture sized and formatted after `descriptor`.
    pub(super) fn create_texture_storage(
        &self,
        descriptor: &TextureDataDescriptor,
        usage: wgpu::TextureUsages,
    ) -> Result<TextureStorage, GraphicsError> {
        let format = convert_texture_format(descriptor.internal_format).ok_or_else(|| {
            GraphicsError::FeatureNotSupported(format!(
                "{:?} textures are not supported by wgpu",
                descriptor.internal_format
            ))
        })?;
        if descriptor.pixel_count() == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture size {}x{} is empty",
                descriptor.width, descriptor.height
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: None,
            size: wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(TextureStorage {
            texture,
            view,
            format,
            descriptor: *descriptor,
        })
    }

    /// Upload a whole image. The caller has checked the byte layout.
    pub(super) fn write_texture_store(&self, storage: &TextureStorage, data: &[u8]) {
        let descriptor = &storage.descriptor;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &storage.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: copy_aspect(storage.format),
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(descriptor.width * descriptor.bytes_per_pixel() as u32),
                rows_per_image: Some(descriptor.height),
            },
            wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Download a whole image, stripping the row padding readback requires.
    pub(super) fn read_texture_store(
        &self,
        storage: &TextureStorage,
    ) -> Result<Vec<u8>, GraphicsError> {
        let descriptor = &storage.descriptor;
        let row_bytes = descriptor.width * descriptor.bytes_per_pixel() as u32;
        let padded_row_bytes = row_bytes.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Texture Readback Buffer"),
            size: u64::from(padded_row_bytes) * u64::from(descriptor.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Texture Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &storage.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: copy_aspect(storage.format),
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(descriptor.height),
                },
            },
            wgpu::Extent3d {
                width: descriptor.width,
                height: descriptor.height,
                depth_or_array_layers: 1,
            },
        );
        let idx = self.queue.submit(std::iter::once(encoder.finish()));
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(idx),
            timeout: Some(std::time::Duration::from_secs(10)),
        });

        let padded = map_staging(self, &staging)?;
        Ok(padded
            .chunks_exact(padded_row_bytes as usize)
            .flat_map(|row| &row[..row_bytes as usize])
            .copied()
            .collect())
    }
}

/// Map a staging buffer for reading and copy its contents out.
fn map_staging(backend: &WgpuBackend, staging: &wgpu::Buffer) -> Result<Vec<u8>, GraphicsError> {
    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    backend.wait_idle();

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(GraphicsError::ResourceCreationFailed(format!(
                "readback mapping failed: {e}"
            )));
        }
        Err(_) => {
            return Err(GraphicsError::ResourceCreationFailed(
                "readback mapping was never completed".to_string(),
            ));
        }
    }
    let data = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(data)
}
