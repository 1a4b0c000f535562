use bevy::asset::RenderAssetUsages;
use bevy::image::Image;
use bevy::render::render_resource::{
    Extent3d, TextureDimension, TextureFormat, TextureViewDescriptor, TextureViewDimension,
};
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

// Cube texture layer order: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

// cd/m² per scene-unit intensity.
pub const ENV_MAP_LUMINANCE: f32 = 1_500.0;

#[derive(Debug, Error)]
pub enum EnvironmentMapError {
    #[error("failed to load cube face {path}: {source}")]
    Face {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cube face {face} is {width}x{height}, faces must be square")]
    NotSquare {
        face: &'static str,
        width: u32,
        height: u32,
    },
    #[error("cube face {face} is {size}px, expected {expected}px like the first face")]
    SizeMismatch {
        face: &'static str,
        size: u32,
        expected: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CubeFaces {
    pub size: u32,
    pub data: Vec<u8>,
}

pub fn stack_cube_faces(faces: &[RgbaImage; 6]) -> Result<CubeFaces, EnvironmentMapError> {
    let size = faces[0].width();
    for (face, name) in faces.iter().zip(CUBE_FACE_NAMES) {
        let (width, height) = face.dimensions();
        if width != height {
            return Err(EnvironmentMapError::NotSquare {
                face: name,
                width,
                height,
            });
        }
        if width != size {
            return Err(EnvironmentMapError::SizeMismatch {
                face: name,
                size: width,
                expected: size,
            });
        }
    }

    let mut data = Vec::with_capacity(size as usize * size as usize * 4 * 6);
    for face in faces {
        data.extend_from_slice(face.as_raw());
    }
    Ok(CubeFaces { size, data })
}

pub fn load_cube_faces(dir: &Path) -> Result<CubeFaces, EnvironmentMapError> {
    let load = |name: &str| -> Result<RgbaImage, EnvironmentMapError> {
        let path = dir.join(format!("{name}.jpg"));
        image::open(&path)
            .map(|img| img.to_rgba8())
            .map_err(|source| EnvironmentMapError::Face {
                path: path.display().to_string(),
                source,
            })
    };

    let faces = [
        load(CUBE_FACE_NAMES[0])?,
        load(CUBE_FACE_NAMES[1])?,
        load(CUBE_FACE_NAMES[2])?,
        load(CUBE_FACE_NAMES[3])?,
        load(CUBE_FACE_NAMES[4])?,
        load(CUBE_FACE_NAMES[5])?,
    ];
    stack_cube_faces(&faces)
}

impl CubeFaces {
    pub fn into_image(self) -> Image {
        let mut image = Image::new(
            Extent3d {
                width: self.size,
                height: self.size,
                depth_or_array_layers: 6,
            },
            TextureDimension::D2,
            self.data,
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::RENDER_WORLD,
        );
        image.texture_view_descriptor = Some(TextureViewDescriptor {
            dimension: Some(TextureViewDimension::Cube),
            ..Default::default()
        });
        image
    }
}

pub fn env_map_luminance(intensity: f32) -> f32 {
    intensity.max(0.0) * ENV_MAP_LUMINANCE
}
