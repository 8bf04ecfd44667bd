use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::{
    error::{ConsensusError, Result},
    traits::{RasterReader, RasterWriter},
    types::{GeoProfile, GeoReference, RasterBand, SampleType},
};

pub const MODEL_PIXEL_SCALE: u16 = 33550;
pub const MODEL_TIEPOINT: u16 = 33922;
pub const MODEL_TRANSFORMATION: u16 = 34264;
pub const GEO_KEY_DIRECTORY: u16 = 34735;
pub const GEO_DOUBLE_PARAMS: u16 = 34736;
pub const GEO_ASCII_PARAMS: u16 = 34737;
pub const GDAL_NODATA: u16 = 42113;

/// GeoTIFF reader and writer backed by the `tiff` crate.
///
/// Reads band 1 of any integer or floating-point TIFF (floats are truncated
/// toward zero) and writes single-band 8-bit masks carrying the same
/// GeoTIFF tags and GDAL_NODATA value. Outputs are written uncompressed
/// whatever the input compression was.
#[derive(Debug, Clone, Default)]
pub struct GeoTiffIo;

impl RasterReader for GeoTiffIo {
    fn read_band(&self, path: &Path) -> Result<RasterBand> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        let georef = read_georef(&mut decoder)?;
        let nodata = match decoder.find_tag(Tag::from_u16_exhaustive(GDAL_NODATA))? {
            Some(value) => Some(value.into_string()?.trim_end_matches('\0').to_string()),
            None => None,
        };
        let pixels = width as usize * height as usize;

        let (values, band_count, sample_type) = match decoder.read_image()? {
            DecodingResult::U8(data) => first_band(data, pixels, SampleType::Uint8, i64::from)?,
            DecodingResult::U16(data) => first_band(data, pixels, SampleType::Uint16, i64::from)?,
            DecodingResult::U32(data) => first_band(data, pixels, SampleType::Uint32, i64::from)?,
            DecodingResult::U64(data) => first_band(data, pixels, SampleType::Uint64, |v| v as i64)?,
            DecodingResult::I8(data) => first_band(data, pixels, SampleType::Int8, i64::from)?,
            DecodingResult::I16(data) => first_band(data, pixels, SampleType::Int16, i64::from)?,
            DecodingResult::I32(data) => first_band(data, pixels, SampleType::Int32, i64::from)?,
            DecodingResult::I64(data) => first_band(data, pixels, SampleType::Int64, |v| v)?,
            DecodingResult::F32(data) => first_band(data, pixels, SampleType::Float32, |v| v as i64)?,
            DecodingResult::F64(data) => first_band(data, pixels, SampleType::Float64, |v| v as i64)?,
            #[allow(unreachable_patterns)]
            _ => {
                return Err(ConsensusError::UnsupportedRaster(format!(
                    "unsupported sample format in {}",
                    path.display()
                )))
            }
        };

        let data = Array2::from_shape_vec((height as usize, width as usize), values)
            .map_err(|err| ConsensusError::UnsupportedRaster(err.to_string()))?;

        debug!(?path, width, height, band_count, %sample_type, "read raster band");
        Ok(RasterBand {
            data,
            profile: GeoProfile {
                width,
                height,
                band_count,
                sample_type,
                georef,
                nodata,
            },
        })
    }
}

impl RasterWriter for GeoTiffIo {
    fn write_band(&self, path: &Path, mask: &Array2<bool>, profile: &GeoProfile) -> Result<()> {
        if mask.dim() != profile.shape() {
            return Err(ConsensusError::ShapeMismatch {
                path: path.to_path_buf(),
                expected: profile.shape(),
                actual: mask.dim(),
            });
        }

        let file = BufWriter::new(File::create(path)?);
        let mut encoder = TiffEncoder::new(file)?;
        let mut image = encoder.new_image::<colortype::Gray8>(profile.width, profile.height)?;

        let georef = &profile.georef;
        let directory = image.encoder();
        if let Some(scale) = &georef.pixel_scale {
            directory.write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), scale.as_slice())?;
        }
        if let Some(tiepoints) = &georef.tiepoints {
            directory.write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), tiepoints.as_slice())?;
        }
        if let Some(transformation) = &georef.transformation {
            directory.write_tag(
                Tag::from_u16_exhaustive(MODEL_TRANSFORMATION),
                transformation.as_slice(),
            )?;
        }
        if let Some(keys) = &georef.key_directory {
            directory.write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), keys.as_slice())?;
        }
        if let Some(params) = &georef.double_params {
            directory.write_tag(Tag::from_u16_exhaustive(GEO_DOUBLE_PARAMS), params.as_slice())?;
        }
        if let Some(params) = &georef.ascii_params {
            directory.write_tag(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS), params.as_str())?;
        }
        if let Some(nodata) = &profile.nodata {
            directory.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), nodata.as_str())?;
        }

        let data: Vec<u8> = mask.iter().map(|&fire| u8::from(fire)).collect();
        image.write_data(&data)?;

        debug!(?path, "wrote mask raster");
        Ok(())
    }
}

fn read_georef<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoReference> {
    let mut georef = GeoReference::default();
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))? {
        georef.pixel_scale = Some(value.into_f64_vec()?);
    }
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT))? {
        georef.tiepoints = Some(value.into_f64_vec()?);
    }
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION))? {
        georef.transformation = Some(value.into_f64_vec()?);
    }
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))? {
        georef.key_directory = Some(value.into_u16_vec()?);
    }
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(GEO_DOUBLE_PARAMS))? {
        georef.double_params = Some(value.into_f64_vec()?);
    }
    if let Some(value) = decoder.find_tag(Tag::from_u16_exhaustive(GEO_ASCII_PARAMS))? {
        georef.ascii_params = Some(value.into_string()?);
    }
    Ok(georef)
}

/// Keep the first sample of each pixel; returns the values and band count.
fn first_band<T: Copy>(
    data: Vec<T>,
    pixels: usize,
    sample_type: SampleType,
    widen: impl Fn(T) -> i64,
) -> Result<(Vec<i64>, u16, SampleType)> {
    if pixels == 0 || data.len() % pixels != 0 {
        return Err(ConsensusError::UnsupportedRaster(format!(
            "{} samples do not divide into {} pixels",
            data.len(),
            pixels
        )));
    }
    let bands = data.len() / pixels;
    let band_count = u16::try_from(bands)
        .map_err(|_| ConsensusError::UnsupportedRaster(format!("{bands} bands")))?;
    let values = data.iter().step_by(bands).map(|&sample| widen(sample)).collect();
    Ok((values, band_count, sample_type))
}
