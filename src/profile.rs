//! Dataset profile: the metadata stamped into every COCO document.
//!
//! The built-in profile describes AppleBBCH81. A YAML file can override any
//! subset of fields:
//!
//! ```yaml
//! info:
//!   description: AppleBBCH76 Dataset
//!   year: 2023
//! categories:
//!   - name: AppleBBCH76
//!     supercategory: apple
//! output_prefix: applebbch76_instances
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OrchardError;
use crate::ir::{AnnotationId, Category, CategoryId, DatasetInfo, ImageId, License, LicenseId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetProfile {
    pub info: InfoProfile,
    pub license: LicenseProfile,

    /// Categories in YOLO class-id order; category ids are assigned from 1.
    pub categories: Vec<CategoryProfile>,

    /// Map every YOLO class id to the first category.
    pub single_class: bool,

    pub image_id_offset: u64,
    pub annotation_id_offset: u64,

    /// `date_captured` written on every image record.
    pub date_captured: Option<String>,

    /// Output files are named `<output_prefix>_<split>.json`.
    pub output_prefix: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InfoProfile {
    pub description: String,
    pub version: String,
    pub year: u32,
    pub contributor: String,
    pub date_created: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LicenseProfile {
    pub id: u64,
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryProfile {
    pub name: String,
    #[serde(default)]
    pub supercategory: Option<String>,
}

impl Default for DatasetProfile {
    fn default() -> Self {
        Self {
            info: InfoProfile::default(),
            license: LicenseProfile::default(),
            categories: vec![CategoryProfile {
                name: "apple".to_string(),
                supercategory: Some("fruit".to_string()),
            }],
            single_class: true,
            image_id_offset: 1,
            annotation_id_offset: 1,
            date_captured: Some("2024-04-12".to_string()),
            output_prefix: "applebbch81_instances".to_string(),
        }
    }
}

impl Default for InfoProfile {
    fn default() -> Self {
        Self {
            description: "AppleBBCH81 Dataset - Apple fruit images for object detection"
                .to_string(),
            version: "1.0".to_string(),
            year: 2024,
            contributor: "Project LZP".to_string(),
            date_created: "2024-04-12".to_string(),
            url: String::new(),
        }
    }
}

impl Default for LicenseProfile {
    fn default() -> Self {
        Self {
            id: 1,
            name: "CC BY 4.0".to_string(),
            url: "https://creativecommons.org/licenses/by/4.0/".to_string(),
        }
    }
}

impl DatasetProfile {
    /// Loads a profile from YAML. Fields not present keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, OrchardError> {
        let data = fs::read_to_string(path).map_err(|err| OrchardError::read(path, err))?;
        let profile: DatasetProfile =
            serde_yaml::from_str(&data).map_err(|source| OrchardError::ProfileParse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.check()?;
        Ok(profile)
    }

    /// Rejects profiles the assembler cannot work with.
    pub fn check(&self) -> Result<(), OrchardError> {
        if self.categories.is_empty() {
            return Err(OrchardError::config("profile defines no categories"));
        }
        if self.categories.iter().any(|c| c.name.trim().is_empty()) {
            return Err(OrchardError::config("profile has a category with an empty name"));
        }
        if self.image_id_offset == 0 || self.annotation_id_offset == 0 {
            return Err(OrchardError::config("id offsets must be at least 1"));
        }
        if self.output_prefix.trim().is_empty() {
            return Err(OrchardError::config("output_prefix must not be empty"));
        }
        Ok(())
    }

    pub fn dataset_info(&self) -> DatasetInfo {
        DatasetInfo {
            description: Some(self.info.description.clone()),
            version: Some(self.info.version.clone()),
            year: Some(self.info.year),
            contributor: Some(self.info.contributor.clone()),
            date_created: Some(self.info.date_created.clone()),
            url: Some(self.info.url.clone()),
        }
    }

    pub fn license(&self) -> License {
        License::new(self.license.id, self.license.name.clone()).with_url(self.license.url.clone())
    }

    pub fn license_id(&self) -> LicenseId {
        LicenseId::new(self.license.id)
    }

    pub fn coco_categories(&self) -> Vec<Category> {
        self.categories
            .iter()
            .enumerate()
            .map(|(index, cat)| {
                let category = Category::new((index + 1) as u64, cat.name.clone());
                match &cat.supercategory {
                    Some(sup) => category.with_supercategory(sup.clone()),
                    None => category,
                }
            })
            .collect()
    }

    /// Category for a YOLO class id, or `None` if the class is not mapped.
    pub fn category_for_class(&self, class_id: usize) -> Option<CategoryId> {
        if self.single_class {
            return Some(CategoryId::new(1));
        }
        if class_id < self.categories.len() {
            Some(CategoryId::new(class_id as u64 + 1))
        } else {
            None
        }
    }

    pub fn first_image_id(&self) -> ImageId {
        ImageId::new(self.image_id_offset)
    }

    pub fn first_annotation_id(&self) -> AnnotationId {
        AnnotationId::new(self.annotation_id_offset)
    }

    pub fn output_file_name(&self, split: &str) -> String {
        format!("{}_{}.json", self.output_prefix, split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_applebbch81() {
        let profile = DatasetProfile::default();
        profile.check().expect("default profile is valid");
        assert_eq!(profile.output_file_name("train"), "applebbch81_instances_train.json");

        let categories = profile.coco_categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, CategoryId(1));
        assert_eq!(categories[0].name, "apple");
        assert_eq!(categories[0].supercategory.as_deref(), Some("fruit"));
    }

    #[test]
    fn single_class_collapses_every_class() {
        let profile = DatasetProfile::default();
        assert_eq!(profile.category_for_class(0), Some(CategoryId(1)));
        assert_eq!(profile.category_for_class(5), Some(CategoryId(1)));
    }

    #[test]
    fn multi_class_maps_by_index() {
        let profile = DatasetProfile {
            single_class: false,
            categories: vec![
                CategoryProfile {
                    name: "apple".into(),
                    supercategory: None,
                },
                CategoryProfile {
                    name: "leaf".into(),
                    supercategory: None,
                },
            ],
            ..Default::default()
        };
        assert_eq!(profile.category_for_class(1), Some(CategoryId(2)));
        assert_eq!(profile.category_for_class(2), None);
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("profile.yaml");
        fs::write(
            &path,
            "categories:\n  - name: AppleBBCH81\n    supercategory: apple\nimage_id_offset: 100\n",
        )
        .expect("write profile");

        let profile = DatasetProfile::from_yaml_file(&path).expect("load profile");
        assert_eq!(profile.categories[0].name, "AppleBBCH81");
        assert_eq!(profile.first_image_id(), ImageId(100));
        assert_eq!(profile.info, InfoProfile::default());
        assert!(profile.single_class);
    }

    #[test]
    fn yaml_with_unknown_field_is_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("profile.yaml");
        fs::write(&path, "colour: red\n").expect("write profile");

        let err = DatasetProfile::from_yaml_file(&path).unwrap_err();
        assert!(matches!(err, OrchardError::ProfileParse { .. }));
    }

    #[test]
    fn missing_profile_error_names_the_file() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("absent.yaml");

        match DatasetProfile::from_yaml_file(&path).unwrap_err() {
            OrchardError::FileRead { path: err_path, .. } => assert_eq!(err_path, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_offset_is_a_configuration_error() {
        let profile = DatasetProfile {
            annotation_id_offset: 0,
            ..Default::default()
        };
        assert!(matches!(
            profile.check(),
            Err(OrchardError::Configuration { .. })
        ));
    }
}
