/// FER+ expression classifier using ONNX Runtime.
///
/// Input: 1×1×64×64 grayscale, raw 0–255 pixel values. Output: 8 logits in
/// FER+ order. `contempt` has no counterpart in [`Expression`] and is dropped
/// after the softmax, so the remaining scores may sum to slightly below 1.
use std::path::Path;

use image::imageops::{self, FilterType};

use crate::detection::infrastructure::execution_provider::build_session;
use crate::expression::domain::expression::{Expression, ExpressionScores};
use crate::expression::domain::expression_classifier::ExpressionClassifier;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: u32 = 64;

/// FER+ output index → category.
const FERPLUS_LABELS: [Option<Expression>; 8] = [
    Some(Expression::Neutral),
    Some(Expression::Happy),
    Some(Expression::Surprised),
    Some(Expression::Sad),
    Some(Expression::Angry),
    Some(Expression::Disgusted),
    Some(Expression::Fearful),
    None, // contempt
];

pub struct OnnxExpressionClassifier {
    session: ort::session::Session,
}

impl OnnxExpressionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: build_session(model_path)?,
        })
    }
}

impl ExpressionClassifier for OnnxExpressionClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
        let tensor = preprocess(frame, face)?;
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("expression classifier produced no outputs".into());
        }
        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.as_slice().ok_or("Cannot get logits slice")?;
        scores_from_logits(logits)
    }
}

/// Square crop around the face center, clamped to the frame.
fn square_crop(face: &FaceBox, frame_width: u32, frame_height: u32) -> FaceBox {
    let side = face
        .width
        .max(face.height)
        .min(frame_width as i32)
        .min(frame_height as i32);
    let cx = face.x + face.width / 2;
    let cy = face.y + face.height / 2;
    let x = (cx - side / 2).clamp(0, frame_width as i32 - side);
    let y = (cy - side / 2).clamp(0, frame_height as i32 - side);
    FaceBox::new(x, y, side, side)
}

fn preprocess(
    frame: &Frame,
    face: &FaceBox,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    let img = frame
        .to_rgb_image()
        .ok_or("expression classifier needs an RGB frame")?;
    let crop_box = square_crop(face, frame.width(), frame.height());
    if crop_box.is_empty() {
        return Err("face crop is empty".into());
    }

    let crop = imageops::crop_imm(
        &img,
        crop_box.x as u32,
        crop_box.y as u32,
        crop_box.width as u32,
        crop_box.height as u32,
    )
    .to_image();
    let gray = image::DynamicImage::ImageRgb8(crop).to_luma8();
    let resized = imageops::resize(&gray, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = pixel.0[0] as f32;
    }
    Ok(tensor)
}

fn scores_from_logits(logits: &[f32]) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
    if logits.len() != FERPLUS_LABELS.len() {
        return Err(format!(
            "expected {} expression logits, got {}",
            FERPLUS_LABELS.len(),
            logits.len()
        )
        .into());
    }
    let probs = softmax(logits);
    Ok(ExpressionScores::from_pairs(
        FERPLUS_LABELS
            .iter()
            .zip(probs)
            .filter_map(|(label, p)| label.map(|e| (e, p))),
    ))
}

fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
