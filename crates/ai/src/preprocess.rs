use es_images::{decode_image, DynamicImage};

use image::{imageops::FilterType, Rgb};
use ndarray::Array4;

/// Side length of the square input the classifier was trained on.
pub const INPUT_SIZE: u32 = 224;
const INPUT_SIDE: usize = 224;

/// Per-channel means subtracted by ResNet50's "caffe" preprocessing, in BGR order.
const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Shape of the tensor produced by [`normalize`]: `[batch, height, width, channels]`.
pub const INPUT_SHAPE: [usize; 4] = [1, INPUT_SIDE, INPUT_SIDE, 3];

/// Decodes an uploaded image and turns it into the `[1, 224, 224, 3]` model input.
pub fn normalize(data: &[u8], maximum_size: u64) -> Result<Array4<f32>, es_images::Error> {
	decode_image(data, maximum_size).map(|img| to_model_input(&img))
}

/// Must match the training pipeline exactly, otherwise predictions silently degrade:
/// the image is converted to RGB (alpha dropped), stretched to 224x224 with
/// nearest-neighbour sampling, its channels reordered to BGR, and the ImageNet
/// channel means subtracted. Values are not scaled.
#[must_use]
pub fn to_model_input(img: &DynamicImage) -> Array4<f32> {
	let rgb = img.to_rgb8();
	let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Nearest);

	let mut input = Array4::zeros(INPUT_SHAPE);
	for (x, y, &Rgb([r, g, b])) in resized.enumerate_pixels() {
		let (x, y) = (x as usize, y as usize);
		input[[0, y, x, 0]] = f32::from(b) - CAFFE_MEAN_BGR[0];
		input[[0, y, x, 1]] = f32::from(g) - CAFFE_MEAN_BGR[1];
		input[[0, y, x, 2]] = f32::from(r) - CAFFE_MEAN_BGR[2];
	}

	input
}
