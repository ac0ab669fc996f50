use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

/// Categories handed out for any label the catalog has no mapping for.
pub const DEFAULT_CATEGORY: &str = "Check Local Guidelines";

#[rustfmt::skip]
const ECOSCAN_CLASS_LABELS: [&str; 25] = [
	"E-waste", "Organics", "aerosol_cans", "automobile wastes", "battery waste",
	"cardboard_boxes", "clothing", "food_and_organic_waste", "glass waste",
	"glass_containers", "light bulbs", "metal waste", "metal_cans",
	"paper_and_print", "paper_cups", "plastic disposables", "plastic waste",
	"plastic_bags", "plastic_bottles", "plastic_detergent_bottles",
	"plastic_food_containers", "shoes", "steel_food_cans",
	"styrofoam_containers", "utensils",
];

const ECOSCAN_CATEGORIES: [(&str, &[&str]); 25] = [
	("E-waste", &["Recyclable (Special Handling)", "Resellable"]),
	("Organics", &["Biodegradable (Compostable)"]),
	("aerosol_cans", &["Recyclable (Empty, Check Local)"]),
	(
		"automobile wastes",
		&["Recyclable (Special Handling)", "Resellable (Parts)"],
	),
	("battery waste", &["Recyclable (Special Handling)"]),
	("cardboard_boxes", &["Recyclable", "Biodegradable"]),
	(
		"clothing",
		&[
			"Reusable",
			"Resellable",
			"Biodegradable (Natural Fibers)",
			"Recyclable (Textile Programs)",
		],
	),
	("food_and_organic_waste", &["Biodegradable (Compostable)"]),
	("glass waste", &["Recyclable"]),
	("glass_containers", &["Recyclable", "Reusable", "Resellable"]),
	("light bulbs", &["Recyclable (Special Handling)"]),
	("metal waste", &["Recyclable", "Resellable"]),
	("metal_cans", &["Recyclable"]),
	("paper_and_print", &["Recyclable", "Biodegradable"]),
	(
		"paper_cups",
		&["Recyclable (Check Local)", "Biodegradable (If unlined)"],
	),
	("plastic disposables", &["Check Local (Often Not Recyclable)"]),
	// Too general to say more
	("plastic waste", &["Check Local (Depends on Type)"]),
	("plastic_bags", &["Recyclable (Special Programs)"]),
	("plastic_bottles", &["Recyclable"]),
	(
		"plastic_detergent_bottles",
		&["Recyclable (Check Local)", "Reusable (Non-food)"],
	),
	(
		"plastic_food_containers",
		&["Recyclable (Check Type/Local)", "Reusable"],
	),
	(
		"shoes",
		&["Reusable", "Resellable", "Recyclable (Special Programs)"],
	),
	("steel_food_cans", &["Recyclable"]),
	("styrofoam_containers", &["Check Local (Often Not Recyclable)"]),
	(
		"utensils",
		&["Reusable", "Resellable (Metal)", "Check Local (Plastic)"],
	),
];

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("class index out of range: <index='{index}', label_count='{label_count}'>")]
	IndexOutOfRange { index: usize, label_count: usize },
}

/// Inconsistencies found while building a catalog; none of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWarning {
	/// A class had no (or an empty) category list and got the default one
	MissingCategories(String),
	/// A category list was given for a label that is not a class of the model
	UnknownLabel(String),
}

/// Maps model output indices to class labels, and class labels to the
/// functional categories describing how the item should be disposed of.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
	labels: Vec<String>,
	categories: HashMap<String, Vec<String>>,
	default_categories: Vec<String>,
	warnings: Vec<CatalogWarning>,
}

impl LabelCatalog {
	pub fn new<L, C, S>(labels: impl IntoIterator<Item = L>, categories: C) -> Self
	where
		L: Into<String>,
		C: IntoIterator<Item = (S, Vec<String>)>,
		S: Into<String>,
	{
		let labels = labels.into_iter().map(Into::into).collect::<Vec<_>>();
		let default_categories = vec![DEFAULT_CATEGORY.to_string()];
		let mut warnings = vec![];

		let mut categories = categories
			.into_iter()
			.map(|(label, categories)| (label.into(), categories))
			.filter(|(_, categories)| !categories.is_empty())
			.collect::<HashMap<String, _>>();

		for label in &labels {
			if !categories.contains_key(label) {
				warn!(%label, "Class has no functional categories, using defaults");
				categories.insert(label.clone(), default_categories.clone());
				warnings.push(CatalogWarning::MissingCategories(label.clone()));
			}
		}

		let mut unknown = categories
			.keys()
			.filter(|label| !labels.contains(*label))
			.cloned()
			.collect::<Vec<_>>();
		unknown.sort_unstable();

		for label in unknown {
			warn!(%label, "Functional categories given for a label the model never predicts");
			warnings.push(CatalogWarning::UnknownLabel(label));
		}

		Self {
			labels,
			categories,
			default_categories,
			warnings,
		}
	}

	/// The catalog matching the 25-class EcoScan waste classifier.
	#[must_use]
	pub fn ecoscan() -> Self {
		Self::new(
			ECOSCAN_CLASS_LABELS,
			ECOSCAN_CATEGORIES.iter().map(|(label, categories)| {
				(
					*label,
					categories
						.iter()
						.map(ToString::to_string)
						.collect::<Vec<_>>(),
				)
			}),
		)
	}

	pub fn class_name_for_index(&self, index: usize) -> Result<&str, CatalogError> {
		self.labels
			.get(index)
			.map(String::as_str)
			.ok_or(CatalogError::IndexOutOfRange {
				index,
				label_count: self.labels.len(),
			})
	}

	/// Never empty: labels without a mapping get `[DEFAULT_CATEGORY]`.
	pub fn categories_for_label(&self, label: &str) -> &[String] {
		self.categories
			.get(label)
			.unwrap_or(&self.default_categories)
	}

	pub fn labels(&self) -> &[String] {
		&self.labels
	}

	pub fn len(&self) -> usize {
		self.labels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.labels.is_empty()
	}

	pub fn warnings(&self) -> &[CatalogWarning] {
		&self.warnings
	}
}

impl Default for LabelCatalog {
	fn default() -> Self {
		Self::ecoscan()
	}
}
