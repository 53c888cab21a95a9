use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::debug;
use opencv::core::{self, Mat, Point2f, Ptr, Rect, Scalar, Size};
use opencv::objdetect::FaceDetectorYN;
use opencv::prelude::*;
use opencv::{dnn, imgcodecs, imgproc};

use super::{ExtractError, FaceEmbedder};
use crate::config::ModelOptions;

impl From<opencv::Error> for ExtractError {
    fn from(err: opencv::Error) -> Self {
        Self::Model(err.to_string())
    }
}

/// YuNet 输出的一行：边框、5 个关键点、置信度
struct DetectedFace {
    bbox: Rect,
    right_eye: Point2f,
    left_eye: Point2f,
    score: f32,
}

impl DetectedFace {
    fn from_row(faces: &Mat, row: i32) -> opencv::Result<Self> {
        let at = |col| faces.at_2d::<f32>(row, col).copied();
        Ok(Self {
            bbox: Rect::new(at(0)? as i32, at(1)? as i32, at(2)? as i32, at(3)? as i32),
            right_eye: Point2f::new(at(4)?, at(5)?),
            left_eye: Point2f::new(at(6)?, at(7)?),
            score: at(14)?,
        })
    }

    /// 以两眼连线将人脸旋转至水平，再裁剪出人脸区域
    fn align(&self, image: &Mat) -> opencv::Result<Option<Mat>> {
        let dy = (self.left_eye.y - self.right_eye.y) as f64;
        let dx = (self.left_eye.x - self.right_eye.x) as f64;
        let angle = dy.atan2(dx).to_degrees();

        let center = Point2f::new(
            self.bbox.x as f32 + self.bbox.width as f32 / 2.,
            self.bbox.y as f32 + self.bbox.height as f32 / 2.,
        );
        let rotation = imgproc::get_rotation_matrix_2d(center, angle, 1.0)?;
        let mut rotated = Mat::default();
        imgproc::warp_affine(
            image,
            &mut rotated,
            &rotation,
            image.size()?,
            imgproc::InterpolationFlags::INTER_LINEAR as i32,
            core::BORDER_CONSTANT,
            Scalar::default(),
        )?;

        let x0 = self.bbox.x.max(0);
        let y0 = self.bbox.y.max(0);
        let x1 = (self.bbox.x + self.bbox.width).min(rotated.cols());
        let y1 = (self.bbox.y + self.bbox.height).min(rotated.rows());
        if x1 <= x0 || y1 <= y0 {
            return Ok(None);
        }
        let crop = Mat::roi(&rotated, Rect::new(x0, y0, x1 - x0, y1 - y0))?.try_clone()?;
        Ok(Some(crop))
    }
}

struct Models {
    detector: Ptr<FaceDetectorYN>,
    net: dnn::Net,
}

impl Models {
    fn detect(&mut self, image: &Mat) -> opencv::Result<Vec<DetectedFace>> {
        self.detector.set_input_size(image.size()?)?;
        let mut faces = Mat::default();
        self.detector.detect(image, &mut faces)?;
        (0..faces.rows()).map(|row| DetectedFace::from_row(&faces, row)).collect()
    }

    fn embed(&mut self, face: &Mat, input_size: i32) -> opencv::Result<Vec<f32>> {
        let blob = dnn::blob_from_image(
            face,
            1.0 / 255.0,
            Size::new(input_size, input_size),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;
        Ok(output.data_typed::<f32>()?.to_vec())
    }
}

/// 基于 OpenCV 的人脸特征提取：YuNet 检测 + 双眼对齐 + ONNX 特征网络
pub struct OpenCvEmbedder {
    models: Mutex<Models>,
    input_size: i32,
}

impl OpenCvEmbedder {
    pub fn open(opts: &ModelOptions) -> opencv::Result<Self> {
        let detector = FaceDetectorYN::create(
            &opts.detector_model.to_string_lossy(),
            "",
            Size::new(320, 320),
            opts.score_threshold,
            opts.nms_threshold,
            5000,
            dnn::Backend::DNN_BACKEND_DEFAULT as i32,
            dnn::Target::DNN_TARGET_CPU as i32,
        )?;
        let net = dnn::read_net_from_onnx(&opts.embedding_model.to_string_lossy())?;
        Ok(Self { models: Mutex::new(Models { detector, net }), input_size: opts.input_size })
    }
}

impl FaceEmbedder for OpenCvEmbedder {
    fn represent(&self, image: &Path) -> Result<Vec<Vec<f32>>, ExtractError> {
        let img = imgcodecs::imread(&image.to_string_lossy(), imgcodecs::IMREAD_COLOR)?;
        if img.rows() == 0 || img.cols() == 0 {
            return Err(ExtractError::Decode(image.display().to_string()));
        }

        let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        let faces = models.detect(&img)?;
        debug!("{}: 检测到 {} 张人脸", image.display(), faces.len());

        let mut embeddings = Vec::with_capacity(faces.len());
        for face in &faces {
            let Some(aligned) = face.align(&img)? else {
                debug!("跳过图片外的人脸区域 {:?}（{:.2}）", face.bbox, face.score);
                continue;
            };
            embeddings.push(models.embed(&aligned, self.input_size)?);
        }

        if embeddings.is_empty() {
            return Err(ExtractError::NoFaceDetected);
        }
        Ok(embeddings)
    }
}
