//! Thread stroke geometry and pipeline.
//!
//! Each thread is smoothed and flattened on the CPU, then expanded into a
//! mitered ribbon of triangles. The ribbon is one pixel wider than the stroke
//! on each side so the fragment shader can anti-alias the edge from the
//! signed across-stroke distance. Per-thread gradient and opacity live in a
//! uniform style table indexed by the vertex `style` attribute.

use wgpu::{BindGroup, Buffer, Device, Queue, RenderPipeline, TextureFormat};

use super::layouts::create_styles_layout;
use super::pipelines::{create_pipeline_layout, create_shader, RenderPipelineBuilder, SCREEN_BLEND};
use crate::frame::{ThreadFrame, MAX_COLOR_STOPS};
use crate::geometry::smooth_polyline;
use crate::threads::Point;

/// Threads drawn per frame. Must match the array length in `threads.wgsl`.
pub const MAX_GPU_THREADS: usize = 128;

/// Miter length cap, in multiples of the half width.
const MITER_LIMIT: f32 = 4.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StrokeVertex {
    /// Clip-space position.
    pub position: [f32; 2],
    pub pixel_y: f32,
    /// Signed distance from the centerline in pixels.
    pub edge_px: f32,
    pub half_width: f32,
    /// Alpha multiplier for hairlines thinner than a pixel.
    pub fade: f32,
    pub style: u32,
    pub _padding: u32,
}

impl StrokeVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32,
        2 => Float32,
        3 => Float32,
        4 => Float32,
        5 => Uint32,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StrokeVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// One entry of the style table. 96 bytes, std140-compatible.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuThreadStyle {
    /// Straight RGBA per stop.
    pub colors: [[f32; 4]; MAX_COLOR_STOPS],
    pub offsets: [f32; 4],
    /// `min_y`, `max_y`, opacity, stop count.
    pub params: [f32; 4],
}

impl GpuThreadStyle {
    pub fn from_frame(thread: &ThreadFrame) -> Self {
        let mut style = Self::default();
        let stops = &thread.color_stops[..thread.color_stops.len().min(MAX_COLOR_STOPS)];
        for (i, stop) in stops.iter().enumerate() {
            style.colors[i] = stop.color;
            style.offsets[i] = stop.offset;
        }
        style.params = [
            thread.gradient_min_y,
            thread.gradient_max_y,
            thread.opacity.clamp(0.0, 1.0),
            stops.len() as f32,
        ];
        style
    }
}

/// Vertices and styles for one frame.
#[derive(Debug, Default, Clone)]
pub struct StrokeBatch {
    pub vertices: Vec<StrokeVertex>,
    pub styles: Vec<GpuThreadStyle>,
}

fn normalize(v: Point) -> Point {
    let len = (v[0] * v[0] + v[1] * v[1]).sqrt();
    if len > f32::EPSILON {
        [v[0] / len, v[1] / len]
    } else {
        [0.0, 0.0]
    }
}

/// Unit normal and miter scale at each polyline vertex.
fn miter_normals(points: &[Point]) -> Vec<(Point, f32)> {
    let n = points.len();
    let seg_normal = |i: usize| {
        let d = normalize([points[i + 1][0] - points[i][0], points[i + 1][1] - points[i][1]]);
        [-d[1], d[0]]
    };
    (0..n)
        .map(|i| {
            if i == 0 {
                (seg_normal(0), 1.0)
            } else if i == n - 1 {
                (seg_normal(n - 2), 1.0)
            } else {
                let a = seg_normal(i - 1);
                let b = seg_normal(i);
                let m = normalize([a[0] + b[0], a[1] + b[1]]);
                if m == [0.0, 0.0] {
                    return (a, 1.0);
                }
                let cos = (m[0] * a[0] + m[1] * a[1]).max(1.0 / MITER_LIMIT);
                (m, 1.0 / cos)
            }
        })
        .collect()
}

/// Expand a pixel-space polyline into triangle-list vertices.
pub fn expand_polyline(points: &[Point], stroke_width: f32, style: u32, width: u32, height: u32) -> Vec<StrokeVertex> {
    if points.len() < 2 || stroke_width <= 0.0 || width == 0 || height == 0 {
        return Vec::new();
    }
    let half = (stroke_width * 0.5).max(0.5);
    let fade = stroke_width.min(1.0);
    let reach = half + 1.0;
    let (w, h) = (width as f32, height as f32);

    let vertex = |p: Point, normal: Point, scale: f32, side: f32| {
        let x = p[0] + normal[0] * reach * scale * side;
        let y = p[1] + normal[1] * reach * scale * side;
        StrokeVertex {
            position: [x / w * 2.0 - 1.0, 1.0 - y / h * 2.0],
            pixel_y: y,
            edge_px: reach * side,
            half_width: half,
            fade,
            style,
            _padding: 0,
        }
    };

    let normals = miter_normals(points);
    let mut out = Vec::with_capacity((points.len() - 1) * 6);
    for i in 0..points.len() - 1 {
        let (n0, s0) = normals[i];
        let (n1, s1) = normals[i + 1];
        let l0 = vertex(points[i], n0, s0, 1.0);
        let r0 = vertex(points[i], n0, s0, -1.0);
        let l1 = vertex(points[i + 1], n1, s1, 1.0);
        let r1 = vertex(points[i + 1], n1, s1, -1.0);
        out.extend_from_slice(&[l0, r0, l1, l1, r0, r1]);
    }
    out
}

/// Build the vertex and style data for a frame's threads.
///
/// Threads beyond [`MAX_GPU_THREADS`] are dropped with a warning.
pub fn build_batch(threads: &[ThreadFrame], subdivisions: u32, width: u32, height: u32) -> StrokeBatch {
    if threads.len() > MAX_GPU_THREADS {
        log::warn!(
            "{} threads exceed the GPU style table, drawing the first {}",
            threads.len(),
            MAX_GPU_THREADS
        );
    }
    let mut batch = StrokeBatch::default();
    for thread in threads.iter().take(MAX_GPU_THREADS) {
        let style = batch.styles.len() as u32;
        batch.styles.push(GpuThreadStyle::from_frame(thread));
        let line = smooth_polyline(&thread.points, subdivisions);
        batch
            .vertices
            .extend(expand_polyline(&line, thread.stroke_width, style, width, height));
    }
    batch
}

/// Pipeline plus buffers for stroking threads.
pub struct StrokePipeline {
    pipeline: RenderPipeline,
    style_buffer: Buffer,
    bind_group: BindGroup,
    vertex_buffer: Buffer,
    vertex_capacity: usize,
    vertex_count: u32,
}

const INITIAL_VERTEX_CAPACITY: usize = 16 * 1024;

fn create_vertex_buffer(device: &Device, capacity: usize) -> Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("thread_vertices"),
        size: (capacity * std::mem::size_of::<StrokeVertex>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl StrokePipeline {
    pub fn new(device: &Device, format: TextureFormat) -> Self {
        let shader = create_shader(device, "threads_shader", include_str!("shaders/threads.wgsl"));
        let styles_layout = create_styles_layout(device);
        let layout = create_pipeline_layout(device, "threads_pipeline_layout", &[&styles_layout]);

        let pipeline = RenderPipelineBuilder::new("threads_pipeline", &shader)
            .layout(&layout)
            .vertex_buffers(vec![StrokeVertex::layout()])
            .format(format)
            .blend(SCREEN_BLEND)
            .build(device);

        let style_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("thread_styles"),
            size: (MAX_GPU_THREADS * std::mem::size_of::<GpuThreadStyle>()) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("thread_styles_bind_group"),
            layout: &styles_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: style_buffer.as_entire_binding(),
            }],
        });

        Self {
            pipeline,
            style_buffer,
            bind_group,
            vertex_buffer: create_vertex_buffer(device, INITIAL_VERTEX_CAPACITY),
            vertex_capacity: INITIAL_VERTEX_CAPACITY,
            vertex_count: 0,
        }
    }

    /// Upload a batch, growing the vertex buffer if needed.
    pub fn upload(&mut self, device: &Device, queue: &Queue, batch: &StrokeBatch) {
        if batch.vertices.len() > self.vertex_capacity {
            self.vertex_capacity = batch.vertices.len().next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(device, self.vertex_capacity);
            log::debug!("Grew thread vertex buffer to {} vertices", self.vertex_capacity);
        }
        if !batch.vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&batch.vertices));
        }
        if !batch.styles.is_empty() {
            queue.write_buffer(&self.style_buffer, 0, bytemuck::cast_slice(&batch.styles));
        }
        self.vertex_count = batch.vertices.len() as u32;
    }

    /// Record the stroke pass into `target`, cleared to transparent.
    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("threads_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
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
            multiview_mask: None,
        });

        if self.vertex_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..self.vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::thread_color_stops;
    use crate::threads::Hsl;

    fn thread(id: u32) -> ThreadFrame {
        ThreadFrame {
            id,
            points: vec![[10.0, 50.0], [50.0, 20.0], [90.0, 50.0]],
            stroke_width: 2.0,
            opacity: 0.7,
            color_stops: thread_color_stops(Hsl::new(200.0, 0.7, 0.6)),
            gradient_min_y: 20.0,
            gradient_max_y: 80.0,
        }
    }

    #[test]
    fn test_style_layout_size() {
        assert_eq!(std::mem::size_of::<GpuThreadStyle>(), 96);
        assert_eq!(std::mem::size_of::<StrokeVertex>(), 32);
    }

    #[test]
    fn test_style_from_frame() {
        let style = GpuThreadStyle::from_frame(&thread(0));
        assert_eq!(style.params, [20.0, 80.0, 0.7, 3.0]);
        assert_eq!(style.offsets[1], 0.5);
    }

    #[test]
    fn test_expand_polyline_vertex_count() {
        let verts = expand_polyline(&[[0.0, 0.0], [10.0, 0.0], [20.0, 5.0]], 2.0, 3, 100, 100);
        assert_eq!(verts.len(), 12);
        assert!(verts.iter().all(|v| v.style == 3));
    }

    #[test]
    fn test_expansion_straddles_centerline() {
        let verts = expand_polyline(&[[0.0, 50.0], [100.0, 50.0]], 4.0, 0, 100, 100);
        let ys: Vec<f32> = verts.iter().map(|v| v.pixel_y).collect();
        assert!(ys.iter().any(|&y| y < 50.0));
        assert!(ys.iter().any(|&y| y > 50.0));
        // half width 2 plus one pixel of feather
        assert!(ys.iter().all(|&y| (y - 50.0).abs() <= 3.0 + 1e-4));
    }

    #[test]
    fn test_clip_space_mapping() {
        let verts = expand_polyline(&[[0.0, 0.0], [100.0, 0.0]], 1.0, 0, 100, 100);
        let right = verts.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        assert!((right - 1.0).abs() < 1e-5);
        assert!(verts.iter().all(|v| v.position[1] <= 1.0 + 0.05));
    }

    #[test]
    fn test_degenerate_input_is_empty() {
        assert!(expand_polyline(&[[1.0, 1.0]], 2.0, 0, 10, 10).is_empty());
        assert!(expand_polyline(&[[0.0, 0.0], [1.0, 1.0]], 0.0, 0, 10, 10).is_empty());
    }

    #[test]
    fn test_batch_caps_thread_count() {
        let threads: Vec<_> = (0..(MAX_GPU_THREADS as u32 + 5)).map(thread).collect();
        let batch = build_batch(&threads, 4, 100, 100);
        assert_eq!(batch.styles.len(), MAX_GPU_THREADS);
        assert!(batch.vertices.iter().all(|v| (v.style as usize) < MAX_GPU_THREADS));
    }
}
