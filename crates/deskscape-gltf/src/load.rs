use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use deskscape_3d::{MAX_JOINTS, Vertex};
use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;

use crate::data::{
    AnimationClip, Channel, ChannelValues, Interpolation, MaterialData, MeshData, ModelData,
    NodeData, PrimitiveData, SkinData, TextureData,
};

pub const READ_CHUNK: usize = 256 * 1024;

/// Percentage of `loaded` over `total`, when the total is known and non-zero.
pub fn percent(loaded: u64, total: Option<u64>) -> Option<f32> {
    match total {
        Some(total) if total > 0 => Some((loaded as f64 / total as f64 * 100.0) as f32),
        _ => None,
    }
}

/// Reads a file in `READ_CHUNK` pieces, calling `on_chunk(loaded, total)`
/// after each one. Returning `false` from the callback aborts the read.
pub fn read_with_progress(
    path: &Path,
    mut on_chunk: impl FnMut(u64, Option<u64>) -> bool,
) -> Result<Vec<u8>> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let total = file.metadata().ok().map(|m| m.len());
    let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = file
            .read(&mut chunk)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..n]);
        if !on_chunk(bytes.len() as u64, total) {
            bail!("read of {} aborted", path.display());
        }
    }
    Ok(bytes)
}

/// Loads a `.gltf` or `.glb` file, resolving external buffers and images
/// relative to the file.
pub fn load_model(path: &Path, on_chunk: impl FnMut(u64, Option<u64>) -> bool) -> Result<ModelData> {
    let bytes = read_with_progress(path, on_chunk)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_model(&bytes, path.parent(), &name)
        .with_context(|| format!("failed to import glTF: {}", path.display()))
}

pub fn parse_model(bytes: &[u8], base: Option<&Path>, name: &str) -> Result<ModelData> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).context("parse glTF document")?;
    let buffers = gltf::import_buffers(&document, base, blob).context("resolve glTF buffers")?;
    let images = gltf::import_images(&document, base, &buffers).context("decode glTF images")?;

    let nodes: Vec<NodeData> = document.nodes().map(|n| read_node(&n)).collect();

    let scene_roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next())
    {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => {
            let mut is_child = vec![false; nodes.len()];
            for node in &nodes {
                for &c in &node.children {
                    if let Some(flag) = is_child.get_mut(c) {
                        *flag = true;
                    }
                }
            }
            (0..nodes.len()).filter(|&i| !is_child[i]).collect()
        }
    };

    let mut meshes = Vec::with_capacity(document.meshes().len());
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for prim in mesh.primitives() {
            if prim.mode() != gltf::mesh::Mode::Triangles {
                log::debug!(
                    "{name}: skipping non-triangle primitive in mesh {}",
                    mesh.index()
                );
                continue;
            }
            if let Some(p) = read_primitive(&prim, &buffers) {
                primitives.push(p);
            }
        }
        meshes.push(MeshData {
            name: mesh.name().unwrap_or("").to_string(),
            primitives,
        });
    }

    let materials = document
        .materials()
        .map(|m| {
            let pbr = m.pbr_metallic_roughness();
            MaterialData {
                name: m.name().unwrap_or("").to_string(),
                base_color: pbr.base_color_factor(),
                base_color_texture: pbr
                    .base_color_texture()
                    .map(|info| info.texture().source().index()),
                double_sided: m.double_sided(),
                unlit: false,
            }
        })
        .collect();

    let textures = images.iter().map(to_rgba8).collect();

    let skins = document
        .skins()
        .map(|skin| {
            let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
            let reader = skin.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
            let inverse_bind = match reader.read_inverse_bind_matrices() {
                Some(iter) => iter.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
                None => vec![Mat4::IDENTITY; joints.len()],
            };
            if joints.len() > MAX_JOINTS {
                log::warn!(
                    "{name}: skin has {} joints, only the first {MAX_JOINTS} animate",
                    joints.len()
                );
            }
            SkinData {
                joints,
                inverse_bind,
            }
        })
        .collect();

    let animations = document
        .animations()
        .map(|anim| read_animation(&anim, &buffers))
        .collect();

    let model = ModelData {
        name: name.to_string(),
        nodes,
        scene_roots,
        meshes,
        materials,
        textures,
        skins,
        animations,
    };
    log::debug!(
        "parsed {name}: {} nodes, {} meshes, {} triangles, {} clips",
        model.nodes.len(),
        model.meshes.len(),
        model.triangle_count(),
        model.animations.len()
    );
    Ok(model)
}

/// Decodes a standalone raster image (JPEG or PNG).
pub fn decode_image(bytes: &[u8]) -> Result<TextureData> {
    let img = image::load_from_memory(bytes)
        .context("decode image")?
        .to_rgba8();
    let (width, height) = img.dimensions();
    Ok(TextureData {
        width,
        height,
        rgba: img.into_raw(),
    })
}

pub fn load_image(path: &Path, on_chunk: impl FnMut(u64, Option<u64>) -> bool) -> Result<TextureData> {
    let bytes = read_with_progress(path, on_chunk)?;
    decode_image(&bytes).with_context(|| format!("failed to load image: {}", path.display()))
}

fn read_node(node: &gltf::Node) -> NodeData {
    let (t, r, s) = node.transform().decomposed();
    NodeData {
        name: node.name().unwrap_or("").to_string(),
        translation: Vec3::from(t),
        rotation: Quat::from_array(r).normalize(),
        scale: Vec3::from(s),
        children: node.children().map(|c| c.index()).collect(),
        mesh: node.mesh().map(|m| m.index()),
        skin: node.skin().map(|s| s.index()),
    }
}

fn read_primitive(prim: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<PrimitiveData> {
    let reader = prim.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));

    let pos: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let count = pos.len();
    let nrm: Vec<[f32; 3]> = reader
        .read_normals()
        .map(|it| it.collect())
        .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; count]);
    let uv_set = prim
        .material()
        .pbr_metallic_roughness()
        .base_color_texture()
        .map(|ti| ti.tex_coord())
        .unwrap_or(0);
    let uv: Vec<[f32; 2]> = reader
        .read_tex_coords(uv_set)
        .map(|tc| tc.into_f32().collect())
        .unwrap_or_else(|| vec![[0.0, 0.0]; count]);
    let joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|j| j.into_u16().collect());
    let weights: Option<Vec<[f32; 4]>> = reader.read_weights(0).map(|w| w.into_f32().collect());

    let max_joint = (MAX_JOINTS - 1) as u32;
    let vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let mut v = Vertex::rigid(
                pos[i],
                nrm.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv.get(i).copied().unwrap_or([0.0, 0.0]),
            );
            if let (Some(joints), Some(weights)) = (&joints, &weights)
                && let (Some(j), Some(w)) = (joints.get(i), weights.get(i))
            {
                v.joints = j.map(|x| (x as u32).min(max_joint));
                v.weights = *w;
            }
            v
        })
        .collect();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(it) => it.into_u32().collect(),
        None => (0..count as u32).collect(),
    };

    Some(PrimitiveData::new(
        vertices,
        indices,
        prim.material().index(),
    ))
}

fn read_animation(anim: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> AnimationClip {
    let mut channels = Vec::new();
    let mut duration = 0.0f32;
    for ch in anim.channels() {
        let reader = ch.reader(|b| buffers.get(b.index()).map(|bb| bb.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        let Some(outputs) = reader.read_outputs() else {
            continue;
        };
        let (interpolation, cubic) = match ch.sampler().interpolation() {
            gltf::animation::Interpolation::Step => (Interpolation::Step, false),
            gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
            gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
        };
        let values = match outputs {
            ReadOutputs::Translations(it) => {
                ChannelValues::Translation(keyframes(it.map(Vec3::from), cubic))
            }
            ReadOutputs::Rotations(it) => ChannelValues::Rotation(keyframes(
                it.into_f32().map(|q| Quat::from_array(q).normalize()),
                cubic,
            )),
            ReadOutputs::Scales(it) => ChannelValues::Scale(keyframes(it.map(Vec3::from), cubic)),
            ReadOutputs::MorphTargetWeights(_) => continue,
        };
        if let Some(&last) = times.last() {
            duration = duration.max(last);
        }
        channels.push(Channel {
            node: ch.target().node().index(),
            times,
            values,
            interpolation,
        });
    }
    AnimationClip {
        name: anim.name().unwrap_or("").to_string(),
        duration,
        channels,
    }
}

/// Cubic-spline samplers store (in-tangent, value, out-tangent) triplets;
/// only the values are kept and sampled linearly.
fn keyframes<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}

fn to_rgba8(img: &gltf::image::Data) -> TextureData {
    use gltf::image::Format;
    let (w, h) = (img.width, img.height);
    let expand = |channels: usize, bytes_per_channel: usize| -> Vec<u8> {
        let stride = channels * bytes_per_channel;
        let mut out = Vec::with_capacity((w * h * 4) as usize);
        for px in img.pixels.chunks_exact(stride) {
            // keep the most significant byte of little-endian 16-bit channels
            let c = |i: usize| px[i * bytes_per_channel + bytes_per_channel - 1];
            let rgba = match channels {
                1 => [c(0), c(0), c(0), 255],
                2 => [c(0), c(0), c(0), c(1)],
                3 => [c(0), c(1), c(2), 255],
                _ => [c(0), c(1), c(2), c(3)],
            };
            out.extend_from_slice(&rgba);
        }
        out
    };
    let rgba = match img.format {
        Format::R8G8B8A8 => img.pixels.clone(),
        Format::R8G8B8 => expand(3, 1),
        Format::R8G8 => expand(2, 1),
        Format::R8 => expand(1, 1),
        Format::R16G16B16A16 => expand(4, 2),
        Format::R16G16B16 => expand(3, 2),
        Format::R16G16 => expand(2, 2),
        Format::R16 => expand(1, 2),
        other => {
            log::warn!("unsupported glTF image format {other:?}, using white");
            return TextureData {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            };
        }
    };
    TextureData {
        width: w,
        height: h,
        rgba,
    }
}
