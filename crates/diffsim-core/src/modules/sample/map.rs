use super::alignment::{ALIGNMENT_KEYWORDS, Alignment};
use super::spheroid::spheroid_semi_axes;
use super::{MATERIAL_KEYWORDS, material_from_section, resolve_scattering_density};
use crate::common::{ElementTables, Material};
use crate::domain::{
    CheckedSection, ConfigResult, ConfigValue, FromSection, KeywordError, KeywordSpec,
    SAMPLE_SECTION, SimError, SimResult,
};
use crate::modules::traits::{ParticleShot, ScatteringModel};
use crate::numerics::dot3;
use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rand::Rng;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Largest voxel grid a generated geometry may span, in cells.
pub const MAX_MAP_CELLS: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapGeometry {
    Sphere,
    Spheroid,
    Cube,
    Custom,
}

impl MapGeometry {
    pub const ALL: [MapGeometry; 4] = [Self::Sphere, Self::Spheroid, Self::Cube, Self::Custom];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Spheroid => "spheroid",
            Self::Cube => "cube",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for MapGeometry {
    type Err = SimError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|geometry| geometry.as_str() == name)
            .ok_or_else(|| {
                SimError::configuration(
                    "CONFIG.INVALID_CHOICE",
                    format!(
                        "'{}' is not a map geometry (expected one of: {})",
                        name,
                        Self::ALL.map(Self::as_str).join(", ")
                    ),
                )
            })
    }
}

impl Display for MapGeometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub geometry: MapGeometry,
    /// Voxel edge length.
    pub dx: f64,
    pub diameter: Option<f64>,
    pub flattening: Option<f64>,
    /// Relative densities indexed `[z, y, x]`, custom geometry only.
    pub map3d: Option<Array3<f64>>,
    pub material: Material,
    pub alignment: Alignment,
    pub number_of_images: usize,
}

impl FromSection for MapSettings {
    const KEYWORDS: KeywordSpec = KeywordSpec {
        section: SAMPLE_SECTION,
        required: &[&["sample_type"], &["geometry"], &["dx"], &MATERIAL_KEYWORDS],
        optional: &[
            "massdensity",
            "number_of_images",
            "diameter",
            "flattening",
            "map3d",
            ALIGNMENT_KEYWORDS[0],
            ALIGNMENT_KEYWORDS[1],
            ALIGNMENT_KEYWORDS[2],
            ALIGNMENT_KEYWORDS[3],
        ],
    };

    fn from_checked(section: CheckedSection<'_>) -> ConfigResult<Self> {
        let name = section.text("geometry")?;
        let geometry = name.parse::<MapGeometry>().map_err(|_| {
            section.invalid_choice("geometry", name, &MapGeometry::ALL.map(MapGeometry::as_str))
        })?;

        let (needed, forbidden): (&[&str], &[&str]) = match geometry {
            MapGeometry::Sphere | MapGeometry::Cube => (&["diameter"], &["flattening", "map3d"]),
            MapGeometry::Spheroid => (&["diameter", "flattening"], &["map3d"]),
            MapGeometry::Custom => (&["map3d"], &["diameter", "flattening"]),
        };
        let missing: Vec<String> = needed
            .iter()
            .filter(|keyword| !section.contains(keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(KeywordError::Missing {
                section: section.name(),
                keywords: missing,
            }
            .into());
        }
        let illegal: Vec<String> = forbidden
            .iter()
            .filter(|keyword| section.contains(keyword))
            .map(|keyword| keyword.to_string())
            .collect();
        if !illegal.is_empty() {
            return Err(KeywordError::Illegal {
                section: section.name(),
                keywords: illegal,
            }
            .into());
        }

        let map3d = section
            .optional_list("map3d")?
            .map(|layers| parse_density_map(&section, layers))
            .transpose()?;

        Ok(Self {
            geometry,
            dx: section.positive_number("dx")?,
            diameter: section.optional_positive_number("diameter")?,
            flattening: section.optional_positive_number("flattening")?,
            map3d,
            material: material_from_section(&section)?,
            alignment: Alignment::from_section(&section)?,
            number_of_images: section.optional_count("number_of_images")?.unwrap_or(1),
        })
    }
}

fn parse_density_map(
    section: &CheckedSection<'_>,
    layers: &[ConfigValue],
) -> ConfigResult<Array3<f64>> {
    let malformed = |detail: &str| {
        SimError::configuration(
            "CONFIG.INVALID_MAP",
            format!(
                "section '{}' keyword 'map3d' must be a non-empty (z, y, x) box of values >= 0: {}",
                section.name(),
                detail
            ),
        )
    };

    let mut values = Vec::new();
    let mut shape: Option<(usize, usize)> = None;
    for layer in layers {
        let rows = layer.as_list().ok_or_else(|| malformed("z layer is not a list"))?;
        let mut layer_width = None;
        for row in rows {
            let row = row.as_list().ok_or_else(|| malformed("y row is not a list"))?;
            if *layer_width.get_or_insert(row.len()) != row.len() {
                return Err(malformed("rows differ in length"));
            }
            for value in row {
                let value = value.as_f64().ok_or_else(|| malformed("entry is not a number"))?;
                if !(value.is_finite() && value >= 0.0) {
                    return Err(malformed("entry is negative or not finite"));
                }
                values.push(value);
            }
        }
        let layer_shape = (rows.len(), layer_width.unwrap_or(0));
        if *shape.get_or_insert(layer_shape) != layer_shape {
            return Err(malformed("layers differ in shape"));
        }
    }

    let (ny, nx) = shape.unwrap_or((0, 0));
    if layers.is_empty() || ny == 0 || nx == 0 {
        return Err(malformed("map is empty"));
    }
    Array3::from_shape_vec((layers.len(), ny, nx), values)
        .map_err(|error| malformed(&error.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Voxel {
    position: [f64; 3],
    weight: f64,
}

/// Particle given by a voxelized density map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSample {
    settings: MapSettings,
    voxels: Vec<Voxel>,
    scattering_density: Complex64,
}

impl MapSample {
    pub fn new(
        settings: MapSettings,
        photon_energy_ev: f64,
        tables: &ElementTables,
    ) -> SimResult<Self> {
        let voxels = voxelize(&settings)?;
        if voxels.is_empty() {
            return Err(SimError::configuration(
                "CONFIG.EMPTY_MAP",
                format!(
                    "{} map with dx={} contains no occupied voxel",
                    settings.geometry, settings.dx
                ),
            ));
        }
        let scattering_density =
            resolve_scattering_density(&settings.material, photon_energy_ev, tables)?;
        tracing::debug!(
            geometry = %settings.geometry,
            voxels = voxels.len(),
            "density map voxelized"
        );
        Ok(Self {
            settings,
            voxels,
            scattering_density,
        })
    }

    pub fn settings(&self) -> &MapSettings {
        &self.settings
    }

    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Sum of relative voxel densities times the voxel volume.
    pub fn occupied_volume(&self) -> f64 {
        let dx = self.settings.dx;
        self.voxels.iter().map(|voxel| voxel.weight).sum::<f64>() * dx * dx * dx
    }
}

fn voxelize(settings: &MapSettings) -> ConfigResult<Vec<Voxel>> {
    let dx = settings.dx;
    let diameter = settings.diameter.unwrap_or(0.0);
    let density = match settings.geometry {
        MapGeometry::Custom => match &settings.map3d {
            Some(map) => map.clone(),
            None => return Ok(Vec::new()),
        },
        MapGeometry::Cube => {
            let n = bounded_cells(settings, (diameter / dx).round())?;
            Array3::from_elem((n, n, n), 1.0)
        }
        MapGeometry::Sphere => {
            let radius = diameter / 2.0;
            let n = bounded_cells(settings, (diameter / dx).ceil())?;
            fill_inside(n, dx, |[x, y, z]| x * x + y * y + z * z <= radius * radius)
        }
        MapGeometry::Spheroid => {
            let (a, c) = spheroid_semi_axes(diameter, settings.flattening.unwrap_or(1.0));
            let n = bounded_cells(settings, (2.0 * a.max(c) / dx).ceil())?;
            fill_inside(n, dx, |[x, y, z]| {
                (x * x + y * y) / (a * a) + z * z / (c * c) <= 1.0
            })
        }
    };

    let (nz, ny, nx) = density.dim();
    let voxels: Vec<Voxel> = density
        .indexed_iter()
        .filter(|(_, weight)| **weight > 0.0)
        .map(|((iz, iy, ix), weight)| Voxel {
            position: [
                centered_coordinate(ix, nx, dx),
                centered_coordinate(iy, ny, dx),
                centered_coordinate(iz, nz, dx),
            ],
            weight: *weight,
        })
        .collect();
    Ok(voxels)
}

/// Cells along one edge of a cubic grid, rejected before allocation when
/// the whole grid would exceed [`MAX_MAP_CELLS`].
fn bounded_cells(settings: &MapSettings, across: f64) -> ConfigResult<usize> {
    let across = across.max(1.0);
    if across.powi(3) > MAX_MAP_CELLS as f64 {
        return Err(SimError::configuration(
            "CONFIG.MAP_TOO_LARGE",
            format!(
                "{} map of diameter {} with dx={} needs {:.3e} cells (limit {})",
                settings.geometry,
                settings.diameter.unwrap_or(0.0),
                settings.dx,
                across.powi(3),
                MAX_MAP_CELLS
            ),
        ));
    }
    Ok(across as usize)
}

fn centered_coordinate(index: usize, count: usize, dx: f64) -> f64 {
    (index as f64 - (count as f64 - 1.0) / 2.0) * dx
}

fn fill_inside<F>(n: usize, dx: f64, inside: F) -> Array3<f64>
where
    F: Fn([f64; 3]) -> bool,
{
    Array3::from_shape_fn((n, n, n), |(iz, iy, ix)| {
        let point = [
            centered_coordinate(ix, n, dx),
            centered_coordinate(iy, n, dx),
            centered_coordinate(iz, n, dx),
        ];
        if inside(point) { 1.0 } else { 0.0 }
    })
}

impl ScatteringModel for MapSample {
    fn number_of_images(&self) -> usize {
        self.settings.number_of_images
    }

    fn radius(&self) -> Option<f64> {
        None
    }

    fn scatter<R: Rng + ?Sized>(
        &mut self,
        q: &Array2<[f64; 3]>,
        rng: &mut R,
    ) -> SimResult<ParticleShot> {
        let orientation = self.settings.alignment.next(rng);
        let rotated: Vec<([f64; 3], f64)> = self
            .voxels
            .iter()
            .map(|voxel| (orientation.rotate(voxel.position), voxel.weight))
            .collect();
        let dx = self.settings.dx;
        let scale = self.scattering_density * (dx * dx * dx);

        let scattering_factors = q.map(|vector| {
            let sum = rotated
                .iter()
                .fold(Complex64::new(0.0, 0.0), |sum, (position, weight)| {
                    sum + Complex64::from_polar(*weight, -dot3(*vector, *position))
                });
            scale * sum
        });
        Ok(ParticleShot {
            scattering_factors,
            euler_angles: Some(orientation.euler_angles()),
            diameter: self.settings.diameter,
        })
    }
}
