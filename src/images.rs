//! Codificación de imágenes para el transporte: parte inline en base64
//! para el modelo y miniatura JPEG para la celda de la hoja de cálculo.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use tracing::warn;

/// Lado mayor de la miniatura que viaja a la hoja. Con calidad JPEG baja,
/// 300 px suele quedar por debajo del límite de 50.000 caracteres por celda.
const SHEET_MAX_DIMENSION: u32 = 300;
const SHEET_JPEG_QUALITY: u8 = 50;
const SHEET_CELL_LIMIT: usize = 50_000;

/// Representación inline de una imagen lista para enviar al modelo:
/// bytes en base64 (sin prefijo data-URL) más su tipo MIME.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub data: String,
    pub mime_type: String,
}

impl InlineImage {
    /// Codifica bytes ya leídos. No valida dimensiones ni contenido; la
    /// lectura del archivo y sus errores de E/S, igual que los límites de
    /// tamaño, son de la capa que recibe el upload.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }
}

/// Reduce la imagen a una miniatura JPEG (lado mayor ≤ 300 px, calidad 50)
/// y la devuelve como data-URL base64, el formato que espera la hoja.
/// Las celdas tienen un límite estricto de caracteres: una imagen a tamaño
/// completo no se guardaría.
pub fn resize_for_sheet(bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(bytes)
        .context("No se pudo decodificar la imagen para redimensionarla")?;

    // Solo se reduce, nunca se agranda: una imagen ya pequeña se
    // recodifica a su tamaño original.
    let thumbnail = if img.width() > SHEET_MAX_DIMENSION || img.height() > SHEET_MAX_DIMENSION {
        img.thumbnail(SHEET_MAX_DIMENSION, SHEET_MAX_DIMENSION)
    } else {
        img
    };

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, SHEET_JPEG_QUALITY);
    thumbnail
        .to_rgb8()
        .write_with_encoder(encoder)
        .context("No se pudo codificar la miniatura JPEG")?;

    let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg));
    if data_url.len() > SHEET_CELL_LIMIT {
        warn!(
            chars = data_url.len(),
            "La miniatura supera el límite de la celda; la hoja podría rechazarla"
        );
    }
    Ok(data_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;

    fn png_de_prueba(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 40]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn from_bytes_codifica_sin_prefijo_data_url() {
        let inline = InlineImage::from_bytes(b"abc", "image/png");
        assert_eq!(inline.data, "YWJj");
        assert_eq!(inline.mime_type, "image/png");
        assert!(!inline.data.starts_with("data:"));
    }

    #[test]
    fn la_miniatura_respeta_el_lado_maximo() {
        let bytes = png_de_prueba(600, 400);
        let data_url = resize_for_sheet(&bytes).unwrap();
        assert!(data_url.starts_with("data:image/jpeg;base64,"));

        let b64 = data_url.trim_start_matches("data:image/jpeg;base64,");
        let jpeg = STANDARD.decode(b64).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert!(thumb.width() <= 300 && thumb.height() <= 300);
        // Proporción 3:2 conservada.
        assert_eq!(thumb.width(), 300);
        assert_eq!(thumb.height(), 200);
    }

    #[test]
    fn una_imagen_pequena_no_se_agranda() {
        let bytes = png_de_prueba(100, 80);
        let data_url = resize_for_sheet(&bytes).unwrap();
        let b64 = data_url.trim_start_matches("data:image/jpeg;base64,");
        let jpeg = STANDARD.decode(b64).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 80));
    }

    #[test]
    fn el_lado_maximo_exacto_no_se_toca() {
        let bytes = png_de_prueba(300, 300);
        let data_url = resize_for_sheet(&bytes).unwrap();
        let b64 = data_url.trim_start_matches("data:image/jpeg;base64,");
        let jpeg = STANDARD.decode(b64).unwrap();
        let thumb = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (300, 300));
    }

    #[test]
    fn bytes_invalidos_fallan_al_redimensionar() {
        assert!(resize_for_sheet(b"esto no es una imagen").is_err());
    }
}
