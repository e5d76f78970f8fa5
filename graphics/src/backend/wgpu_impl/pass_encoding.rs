//! Draw submission encoding for the wgpu backend.
//!
//! Shader resources are laid out in three bind groups:
//!
//! - group 0: uniform buffers, `@binding` = binding point
//! - group 1: storage buffers (read-only), `@binding` = binding point
//! - group 2: textures at `@binding(2 * unit)`, their samplers at `2 * unit + 1`
//!
//! Pipelines are cached per program, vertex layout, target formats, render
//! settings and resource layout.

use crate::backend::{BufferBinding, DrawCall, DrawSubmission, ProgramName, TextureBinding};
use crate::error::GraphicsError;
use crate::shader::ShaderStage;
use crate::types::{
    BufferTarget, CullTarget, FrameAttachment, RenderSettings, TextureDataDescriptor,
    VertexAttribute,
};

use super::conversion::{
    convert_cull, convert_depth_testing, convert_index_format, convert_mag_filter,
    convert_min_filter, convert_vertex_format, convert_wrap_mode,
};
use super::{DefaultTarget, TextureStorage, WgpuBackend, WgpuState, unknown};

const UNIFORM_GROUP: u32 = 0;
const STORAGE_GROUP: u32 = 1;
const TEXTURE_GROUP: u32 = 2;
const GROUP_COUNT: usize = 3;

/// Place per-group values at their group index.
fn by_group<T: Default>(uniform: T, storage: T, texture: T) -> [T; GROUP_COUNT] {
    let mut groups: [T; GROUP_COUNT] = Default::default();
    groups[UNIFORM_GROUP as usize] = uniform;
    groups[STORAGE_GROUP as usize] = storage;
    groups[TEXTURE_GROUP as usize] = texture;
    groups
}

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct PipelineKey {
    pub(super) program: ProgramName,
    stride: u32,
    attributes: Vec<VertexAttribute>,
    colour_formats: Vec<wgpu::TextureFormat>,
    depth_format: Option<wgpu::TextureFormat>,
    settings: RenderSettings,
    uniforms: Vec<u32>,
    storage: Vec<u32>,
    textures: Vec<(u32, wgpu::TextureSampleType)>,
}

pub(super) struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    layouts: [wgpu::BindGroupLayout; GROUP_COUNT],
}

/// Views a pass renders into.
struct PassTargets<'a> {
    colours: Vec<&'a TextureStorage>,
    depth: Option<&'a TextureStorage>,
}

impl PassTargets<'_> {
    fn formats(&self) -> (Vec<wgpu::TextureFormat>, Option<wgpu::TextureFormat>) {
        (
            self.colours.iter().map(|s| s.format).collect(),
            self.depth.map(|s| s.format),
        )
    }
}

impl WgpuBackend {
    pub(super) fn encode_submission(
        &self,
        state: &mut WgpuState,
        submission: &DrawSubmission,
    ) -> Result<(), GraphicsError> {
        if !state.programs.contains_key(&submission.program) {
            return Err(unknown("submit", submission.program));
        }
        if submission.framebuffer.is_none() {
            let width = (submission.viewport.x + submission.viewport.width).max(1.0) as u32;
            let height = (submission.viewport.y + submission.viewport.height).max(1.0) as u32;
            self.ensure_default_target(state, width, height)?;
        }

        let (colour_formats, depth_format) = resolve_targets(state, submission)?.formats();
        let uniforms = binding_points(&submission.buffers, BufferTarget::Uniform);
        let storage = binding_points(&submission.buffers, BufferTarget::ShaderStorage);
        let textures = submission
            .textures
            .iter()
            .map(|binding| Ok((binding.unit, texture_storage(state, binding)?.1)))
            .collect::<Result<Vec<_>, GraphicsError>>()?;

        let skip_draws = submission.settings.cull == CullTarget::Both;
        let mut keys = Vec::with_capacity(submission.draws.len());
        if !skip_draws {
            for draw in &submission.draws {
                let key = PipelineKey {
                    program: submission.program,
                    stride: if draw.vertex_buffer.is_some() { draw.stride } else { 0 },
                    attributes: if draw.vertex_buffer.is_some() {
                        draw.attributes.clone()
                    } else {
                        Vec::new()
                    },
                    colour_formats: colour_formats.clone(),
                    depth_format,
                    settings: submission.settings,
                    uniforms: uniforms.clone(),
                    storage: storage.clone(),
                    textures: textures.clone(),
                };
                if !state.pipelines.contains_key(&key) {
                    let pipeline = self.create_pipeline(state, &key)?;
                    log::trace!("WgpuBackend: created pipeline for {}", key.program);
                    state.pipelines.insert(key.clone(), pipeline);
                }
                keys.push(key);
            }
        }

        let state = &*state;
        let targets = resolve_targets(state, submission)?;
        let samplers = submission
            .textures
            .iter()
            .map(|binding| self.create_sampler(binding, texture_storage(state, binding)?.1))
            .collect::<Result<Vec<_>, GraphicsError>>()?;

        let mut bind_groups = Vec::with_capacity(keys.len());
        for key in &keys {
            let Some(cached) = state.pipelines.get(key) else {
                continue;
            };
            bind_groups.push(self.create_bind_groups(state, submission, cached, &samplers)?);
        }

        let colour = submission.clear_colour;
        let colour_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = targets
            .colours
            .iter()
            .map(|storage| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &storage.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: colour.r as f64,
                            g: colour.g as f64,
                            b: colour.b as f64,
                            a: colour.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            })
            .collect();
        let depth_stencil_attachment =
            targets
                .depth
                .map(|storage| wgpu::RenderPassDepthStencilAttachment {
                    view: &storage.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Garnet Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Garnet Pass"),
                color_attachments: &colour_attachments,
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            let vp = &submission.viewport;
            pass.set_viewport(vp.x, vp.y, vp.width, vp.height, vp.min_depth, vp.max_depth);

            for ((draw, key), groups) in submission.draws.iter().zip(&keys).zip(&bind_groups) {
                let Some(cached) = state.pipelines.get(key) else {
                    continue;
                };
                self.encode_draw(state, &mut pass, draw, cached, groups)?;
            }
        }

        let idx = self.queue.submit(std::iter::once(encoder.finish()));
        let _ = self.device.poll(wgpu::PollType::Wait {
            submission_index: Some(idx),
            timeout: Some(std::time::Duration::from_secs(10)),
        });
        log::trace!(
            "WgpuBackend: submitted {} draws into {}",
            keys.len(),
            submission
                .framebuffer
                .map_or_else(|| "default framebuffer".to_string(), |f| f.to_string())
        );
        Ok(())
    }

    fn encode_draw(
        &self,
        state: &WgpuState,
        pass: &mut wgpu::RenderPass<'_>,
        draw: &DrawCall,
        cached: &CachedPipeline,
        groups: &[wgpu::BindGroup; GROUP_COUNT],
    ) -> Result<(), GraphicsError> {
        if draw.element_count == 0 {
            return Ok(());
        }
        pass.set_pipeline(&cached.pipeline);
        for group in [UNIFORM_GROUP, STORAGE_GROUP, TEXTURE_GROUP] {
            pass.set_bind_group(group, &groups[group as usize], &[]);
        }
        if let Some(name) = draw.vertex_buffer {
            let entry = state.buffers.get(&name).ok_or_else(|| unknown("submit", name))?;
            let Some(buffer) = &entry.buffer else {
                log::trace!("WgpuBackend: skipping draw from empty {}", name);
                return Ok(());
            };
            pass.set_vertex_buffer(0, buffer.slice(..));
        }
        match draw.index_buffer {
            Some((name, format)) => {
                let entry = state.buffers.get(&name).ok_or_else(|| unknown("submit", name))?;
                let Some(buffer) = &entry.buffer else {
                    log::trace!("WgpuBackend: skipping draw from empty {}", name);
                    return Ok(());
                };
                pass.set_index_buffer(buffer.slice(..), convert_index_format(format));
                pass.draw_indexed(0..draw.element_count, 0, 0..1);
            }
            None => pass.draw(0..draw.element_count, 0..1),
        }
        Ok(())
    }

    fn ensure_default_target(
        &self,
        state: &mut WgpuState,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        if let Some(target) = &state.default_target
            && target.width == width
            && target.height == height
        {
            return Ok(());
        }
        let usage = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        let colour =
            self.create_texture_storage(&TextureDataDescriptor::rgba8(width, height), usage)?;
        let depth =
            self.create_texture_storage(&TextureDataDescriptor::depth32f(width, height), usage)?;
        if let Some(old) = state.default_target.replace(DefaultTarget {
            width,
            height,
            colour,
            depth,
        }) {
            old.colour.texture.destroy();
            old.depth.texture.destroy();
        }
        log::debug!("WgpuBackend: default framebuffer is {}x{}", width, height);
        Ok(())
    }

    fn create_pipeline(
        &self,
        state: &WgpuState,
        key: &PipelineKey,
    ) -> Result<CachedPipeline, GraphicsError> {
        let program = state
            .programs
            .get(&key.program)
            .ok_or_else(|| unknown("submit", key.program))?;
        let (vertex_module, vertex_entry) = program.stage(ShaderStage::Vertex).ok_or_else(|| {
            GraphicsError::ShaderCreationFailed(format!("{} has no vertex stage", key.program))
        })?;

        let visibility = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let buffer_entries = |points: &[u32], ty: wgpu::BufferBindingType| {
            points
                .iter()
                .map(|point| wgpu::BindGroupLayoutEntry {
                    binding: *point,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect::<Vec<_>>()
        };
        let uniform_entries = buffer_entries(&key.uniforms, wgpu::BufferBindingType::Uniform);
        let storage_entries = buffer_entries(
            &key.storage,
            wgpu::BufferBindingType::Storage { read_only: true },
        );
        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = key
            .textures
            .iter()
            .flat_map(|(unit, sample_type)| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: 2 * unit,
                        visibility,
                        ty: wgpu::BindingType::Texture {
                            sample_type: *sample_type,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2 * unit + 1,
                        visibility,
                        ty: wgpu::BindingType::Sampler(sampler_binding_type(*sample_type)),
                        count: None,
                    },
                ]
            })
            .collect();

        let layouts = by_group(
            ("Garnet Uniforms", uniform_entries),
            ("Garnet Storage", storage_entries),
            ("Garnet Textures", texture_entries),
        )
        .map(|(label, entries)| {
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(label),
                    entries: &entries,
                })
        });

        let pipeline_layout = {
            let refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
            self.device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Garnet Pipeline Layout"),
                    bind_group_layouts: &refs,
                    immediate_size: 0,
                })
        };

        let attributes: Vec<wgpu::VertexAttribute> = key
            .attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: convert_vertex_format(attribute.format),
                offset: u64::from(attribute.offset),
                shader_location: attribute.location,
            })
            .collect();
        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = if key.stride == 0 {
            Vec::new()
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: u64::from(key.stride),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }]
        };

        let colour_targets: Vec<Option<wgpu::ColorTargetState>> = key
            .colour_formats
            .iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format: *format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let polygon_mode = if key.settings.wireframe
            && self
                .device
                .features()
                .contains(wgpu::Features::POLYGON_MODE_LINE)
        {
            wgpu::PolygonMode::Line
        } else {
            wgpu::PolygonMode::Fill
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Garnet Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some(vertex_entry),
                    buffers: &vertex_buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: program.stage(ShaderStage::Fragment).map(|(module, entry)| {
                    wgpu::FragmentState {
                        module,
                        entry_point: Some(entry),
                        targets: &colour_targets,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: convert_cull(key.settings.cull),
                    polygon_mode,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: key.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: convert_depth_testing(key.settings.depth),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Ok(CachedPipeline { pipeline, layouts })
    }

    fn create_sampler(
        &self,
        binding: &TextureBinding,
        sample_type: wgpu::TextureSampleType,
    ) -> Result<wgpu::Sampler, GraphicsError> {
        let parameters = &binding.parameters;
        let (mut min_filter, mut mipmap_filter) = convert_min_filter(parameters.min_filter);
        let mut mag_filter = convert_mag_filter(parameters.mag_filter);
        if sampler_binding_type(sample_type) != wgpu::SamplerBindingType::Filtering {
            min_filter = wgpu::FilterMode::Nearest;
            mag_filter = wgpu::FilterMode::Nearest;
            mipmap_filter = wgpu::MipmapFilterMode::Nearest;
        }
        Ok(self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: convert_wrap_mode(parameters.horizontal_wrap),
            address_mode_v: convert_wrap_mode(parameters.vertical_wrap),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter,
            min_filter,
            mipmap_filter,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        }))
    }

    fn create_bind_groups(
        &self,
        state: &WgpuState,
        submission: &DrawSubmission,
        cached: &CachedPipeline,
        samplers: &[wgpu::Sampler],
    ) -> Result<[wgpu::BindGroup; GROUP_COUNT], GraphicsError> {
        let buffer_entries = |target: BufferTarget| {
            submission
                .buffers
                .iter()
                .filter(|binding| binding.target == target)
                .map(|binding| {
                    let entry = state
                        .buffers
                        .get(&binding.buffer)
                        .ok_or_else(|| unknown("submit", binding.buffer))?;
                    let buffer = entry.buffer.as_ref().ok_or_else(|| {
                        GraphicsError::InvalidParameter(format!(
                            "submit: {} bound at {} has no data",
                            binding.buffer, binding.binding_point
                        ))
                    })?;
                    Ok(wgpu::BindGroupEntry {
                        binding: binding.binding_point,
                        resource: buffer.as_entire_binding(),
                    })
                })
                .collect::<Result<Vec<_>, GraphicsError>>()
        };
        let uniform_entries = buffer_entries(BufferTarget::Uniform)?;
        let storage_entries = buffer_entries(BufferTarget::ShaderStorage)?;

        let mut texture_entries = Vec::with_capacity(submission.textures.len() * 2);
        for (binding, sampler) in submission.textures.iter().zip(samplers) {
            let (storage, _) = texture_storage(state, binding)?;
            texture_entries.push(wgpu::BindGroupEntry {
                binding: 2 * binding.unit,
                resource: wgpu::BindingResource::TextureView(&storage.view),
            });
            texture_entries.push(wgpu::BindGroupEntry {
                binding: 2 * binding.unit + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        let entries = by_group(uniform_entries, storage_entries, texture_entries);
        Ok(std::array::from_fn(|group| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: None,
                layout: &cached.layouts[group],
                entries: &entries[group],
            })
        }))
    }
}

fn binding_points(buffers: &[BufferBinding], target: BufferTarget) -> Vec<u32> {
    buffers
        .iter()
        .filter(|binding| binding.target == target)
        .map(|binding| binding.binding_point)
        .collect()
}

fn sampler_binding_type(sample_type: wgpu::TextureSampleType) -> wgpu::SamplerBindingType {
    match sample_type {
        wgpu::TextureSampleType::Float { filterable: true } => wgpu::SamplerBindingType::Filtering,
        _ => wgpu::SamplerBindingType::NonFiltering,
    }
}

fn texture_storage<'a>(
    state: &'a WgpuState,
    binding: &TextureBinding,
) -> Result<(&'a TextureStorage, wgpu::TextureSampleType), GraphicsError> {
    let storage = state
        .textures
        .get(&binding.texture)
        .ok_or_else(|| unknown("submit", binding.texture))?
        .storage
        .as_ref()
        .ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "submit: {} on unit {} has no storage",
                binding.texture, binding.unit
            ))
        })?;
    let sample_type = storage
        .format
        .sample_type(None, None)
        .unwrap_or(wgpu::TextureSampleType::Float { filterable: true });
    Ok((storage, sample_type))
}

fn resolve_targets<'a>(
    state: &'a WgpuState,
    submission: &DrawSubmission,
) -> Result<PassTargets<'a>, GraphicsError> {
    let Some(framebuffer) = submission.framebuffer else {
        let target = state.default_target.as_ref().ok_or_else(|| {
            GraphicsError::InvalidParameter("submit: default framebuffer missing".to_string())
        })?;
        return Ok(PassTargets {
            colours: vec![&target.colour],
            depth: Some(&target.depth),
        });
    };
    let attachments = state
        .framebuffers
        .get(&framebuffer)
        .ok_or_else(|| unknown("submit", framebuffer))?;

    let mut targets = PassTargets {
        colours: Vec::new(),
        depth: None,
    };
    // BTreeMap order puts Colour before ExtraColour1..3.
    for (attachment, target) in attachments {
        let storage = state.attachment_storage(*target).ok_or_else(|| {
            GraphicsError::InvalidParameter(format!(
                "submit: {framebuffer} {attachment:?} attachment has no storage"
            ))
        })?;
        match attachment {
            FrameAttachment::Depth => targets.depth = Some(storage),
            _ => targets.colours.push(storage),
        }
    }
    if targets.colours.is_empty() && targets.depth.is_none() {
        return Err(GraphicsError::InvalidParameter(format!(
            "submit: {framebuffer} has no attachments"
        )));
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BufferName;

    #[test]
    fn test_groups_follow_layout() {
        assert_eq!(by_group("uniform", "storage", "texture"), ["uniform", "storage", "texture"]);
        let mut groups = [UNIFORM_GROUP, STORAGE_GROUP, TEXTURE_GROUP];
        groups.sort_unstable();
        groups.iter().zip(0..).for_each(|(group, index)| assert_eq!(*group, index));
    }

    #[test]
    fn test_binding_points_filter_by_target() {
        let buffers = [
            BufferBinding {
                target: BufferTarget::Uniform,
                binding_point: 2,
                buffer: BufferName(1),
            },
            BufferBinding {
                target: BufferTarget::ShaderStorage,
                binding_point: 0,
                buffer: BufferName(2),
            },
            BufferBinding {
                target: BufferTarget::Uniform,
                binding_point: 0,
                buffer: BufferName(3),
            },
        ];
        assert_eq!(binding_points(&buffers, BufferTarget::Uniform), vec![2, 0]);
        assert_eq!(binding_points(&buffers, BufferTarget::ShaderStorage), vec![0]);
        assert!(binding_points(&buffers, BufferTarget::Array).is_empty());
    }

    #[test]
    fn test_sampler_binding_type() {
        assert_eq!(
            sampler_binding_type(wgpu::TextureSampleType::Float { filterable: true }),
            wgpu::SamplerBindingType::Filtering
        );
        assert_eq!(
            sampler_binding_type(wgpu::TextureSampleType::Float { filterable: false }),
            wgpu::SamplerBindingType::NonFiltering
        );
        assert_eq!(
            sampler_binding_type(wgpu::TextureSampleType::Uint),
            wgpu::SamplerBindingType::NonFiltering
        );
    }
}
