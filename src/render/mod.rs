pub mod pipeline;

use std::sync::Arc;
use winit::window::Window;

use crate::assets::Frame;
use crate::error::Result;

use self::pipeline::{SpritePipeline, SpriteTexture};

/// GPU objects shared by every pet window.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub pipeline: SpritePipeline,
}

/// One pet window's swapchain plus the frame it last uploaded.
pub struct SpriteSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    texture: Option<SpriteTexture>,
    /// Pixels currently in `texture`; compared by pointer to skip re-uploads.
    shown: Option<Arc<[u8]>>,
}

fn create_instance() -> wgpu::Instance {
    // DX12 only on Windows: Vulkan WSI there can't do transparent
    // composition. DirectComposition gives per-pixel alpha.
    #[cfg(windows)]
    let desc = wgpu::InstanceDescriptor {
        backends: wgpu::Backends::DX12,
        backend_options: wgpu::BackendOptions {
            dx12: wgpu::Dx12BackendOptions {
                presentation_system: wgpu_types::Dx12SwapchainKind::DxgiFromVisual,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    };
    #[cfg(not(windows))]
    let desc = wgpu::InstanceDescriptor::default();

    wgpu::Instance::new(&desc)
}

/// Prefer a non-sRGB 8-bit format so premultiplied sprite bytes reach the
/// compositor unchanged.
pub fn pick_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
    [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().find(|f| !f.is_srgb()).copied())
        .or_else(|| formats.first().copied())
        .unwrap_or(wgpu::TextureFormat::Bgra8Unorm)
}

pub fn pick_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
        wgpu::CompositeAlphaMode::PreMultiplied
    } else if modes.contains(&wgpu::CompositeAlphaMode::PostMultiplied) {
        wgpu::CompositeAlphaMode::PostMultiplied
    } else {
        log::warn!(
            "No transparent alpha mode available (got {modes:?}); pets will have a background"
        );
        wgpu::CompositeAlphaMode::Auto
    }
}

impl GpuContext {
    /// Initialize wgpu against the first pet window.
    pub fn new(window: Arc<Window>) -> Result<(Self, SpriteSurface)> {
        let instance = create_instance();
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        log::info!(
            "GPU adapter: {:?} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("deskpet_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            ..Default::default()
        }))?;

        let caps = surface.get_capabilities(&adapter);
        let format = pick_format(&caps.formats);
        log::info!("Surface format {:?}, alpha modes {:?}", format, caps.alpha_modes);

        let pipeline = SpritePipeline::new(&device, format);

        let gpu = Self {
            instance,
            adapter,
            device,
            queue,
            format,
            pipeline,
        };
        let sprite_surface = gpu.configure(&window, surface);
        Ok((gpu, sprite_surface))
    }

    /// Surface for another pet window on the shared device.
    pub fn create_surface(&self, window: Arc<Window>) -> Result<SpriteSurface> {
        let surface = self.instance.create_surface(window.clone())?;
        Ok(self.configure(&window, surface))
    }

    fn configure(&self, window: &Window, surface: wgpu::Surface<'static>) -> SpriteSurface {
        let size = window.inner_size();
        let caps = surface.get_capabilities(&self.adapter);
        if !caps.formats.contains(&self.format) {
            log::warn!("Surface does not list {:?}; presenting anyway", self.format);
        }

        // Mailbox doesn't block on missed deadlines; Fifo is always there.
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: pick_alpha_mode(&caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&self.device, &config);

        SpriteSurface {
            surface,
            config,
            texture: None,
            shown: None,
        }
    }
}

impl SpriteSurface {
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Resize the surface.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if (width, height) == self.size() {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&gpu.device, &self.config);
    }

    /// Put `frame` in the sprite texture unless it is already there.
    fn upload(&mut self, gpu: &GpuContext, frame: &Frame) {
        if let Some(shown) = &self.shown {
            if Arc::ptr_eq(shown, &frame.rgba) {
                return;
            }
        }
        let fits = self
            .texture
            .as_ref()
            .is_some_and(|t| t.width == frame.width && t.height == frame.height);
        if !fits {
            let texture = gpu.pipeline.create_texture(&gpu.device, frame.width, frame.height);
            self.texture = Some(texture);
        }
        if let Some(texture) = &self.texture {
            texture.write(&gpu.queue, &frame.rgba);
            self.shown = Some(frame.rgba.clone());
        }
    }

    /// Clear to transparent and draw `frame` over the whole window.
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn draw(&mut self, gpu: &GpuContext, frame: Option<&Frame>) {
        if let Some(frame) = frame {
            self.upload(gpu, frame);
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&gpu.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                return;
            }
            Err(e) => {
                log::warn!("Surface error: {e:?}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pet_frame_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sprite_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(texture) = self.texture.as_ref().filter(|_| frame.is_some()) {
                let p = &gpu.pipeline;
                render_pass.set_pipeline(&p.pipeline);
                render_pass.set_bind_group(0, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, p.vertex_buffer.slice(..));
                render_pass.set_index_buffer(p.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..6, 0, 0..1);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_linear_bgra() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(pick_format(&formats), wgpu::TextureFormat::Bgra8Unorm);
    }

    #[test]
    fn falls_back_to_srgb_when_nothing_else() {
        let formats = [wgpu::TextureFormat::Rgba8UnormSrgb];
        assert_eq!(pick_format(&formats), wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(pick_format(&[]), wgpu::TextureFormat::Bgra8Unorm);
    }

    #[test]
    fn alpha_mode_prefers_premultiplied() {
        let modes = [
            wgpu::CompositeAlphaMode::Opaque,
            wgpu::CompositeAlphaMode::PostMultiplied,
            wgpu::CompositeAlphaMode::PreMultiplied,
        ];
        assert_eq!(pick_alpha_mode(&modes), wgpu::CompositeAlphaMode::PreMultiplied);
        assert_eq!(
            pick_alpha_mode(&[wgpu::CompositeAlphaMode::Opaque]),
            wgpu::CompositeAlphaMode::Auto
        );
    }
}
