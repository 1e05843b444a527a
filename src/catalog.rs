//! Closed configuration vocabulary for the inspection line.
//!
//! Models, processes, spec-field options, and per-process defect labels are
//! data, not code: the catalog ships a built-in factory vocabulary and can be
//! replaced wholesale from a JSON file, so new models or processes never
//! require a code change. The same applies to the process-family rules that
//! decide which header fields (version, temperature equipment, aging
//! equipment) a process carries.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::models::ModelGroup;

/// Vocabulary for one model group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCatalog {
    pub models: Vec<String>,
    /// Ordered process list; ordinals in the names drive the family rules.
    pub processes: Vec<String>,
    pub ranges: Vec<String>,
    pub connection_types: Vec<String>,
    pub sensor_thicknesses: Vec<String>,
    pub versions: Vec<String>,
    pub temp_equipments: Vec<String>,
    pub aging_equipments: Vec<String>,
    /// Known defect labels per process; processes without an entry accept
    /// free-text labels only.
    #[serde(default)]
    pub defects: HashMap<String, Vec<String>>,
}

/// Header field gated by a process-family rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    Version,
    TempEquip,
    AgingEquip,
}

/// Pattern rule mapping a process family to an applicable header field.
///
/// A process matches when its name contains any of `name_markers` or starts
/// with any of `ordinal_prefixes`. Prefix matching keeps `"5."` from
/// matching `"15.에이징검사"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub field: HeaderField,
    #[serde(default)]
    pub name_markers: Vec<String>,
    #[serde(default)]
    pub ordinal_prefixes: Vec<String>,
}

impl FieldRule {
    pub fn matches(&self, process: &str) -> bool {
        self.name_markers.iter().any(|m| process.contains(m.as_str()))
            || self
                .ordinal_prefixes
                .iter()
                .any(|p| process.starts_with(p.as_str()))
    }
}

/// Which of the gated header fields apply to a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldApplicability {
    pub version: bool,
    pub temp_equip: bool,
    pub aging_equip: bool,
}

/// The full configuration vocabulary, partitioned by model group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub groups: HashMap<ModelGroup, GroupCatalog>,
    pub field_rules: Vec<FieldRule>,
}

impl Catalog {
    /// Load a replacement vocabulary from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open catalog file {}", path.display()))?;
        let catalog: Catalog = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("catalog file {} is not valid", path.display()))?;
        Ok(catalog)
    }

    /// Group a model belongs to. Models outside the IGS list fall back to
    /// PT/UPT, which also covers free-text legacy models.
    pub fn group_of(&self, model: &str) -> ModelGroup {
        let igs = self
            .groups
            .get(&ModelGroup::Igs)
            .map_or(false, |g| g.models.iter().any(|m| m == model));
        if igs {
            ModelGroup::Igs
        } else {
            ModelGroup::PtUpt
        }
    }

    pub fn group(&self, group: ModelGroup) -> Option<&GroupCatalog> {
        self.groups.get(&group)
    }

    /// Evaluate the family rules for a process name.
    pub fn applicable_fields(&self, process: &str) -> FieldApplicability {
        let mut applicability = FieldApplicability::default();
        for rule in &self.field_rules {
            if !rule.matches(process) {
                continue;
            }
            match rule.field {
                HeaderField::Version => applicability.version = true,
                HeaderField::TempEquip => applicability.temp_equip = true,
                HeaderField::AgingEquip => applicability.aging_equip = true,
            }
        }
        applicability
    }

    /// Known defect labels for a process, empty when none are catalogued.
    pub fn defect_labels(&self, group: ModelGroup, process: &str) -> &[String] {
        self.groups
            .get(&group)
            .and_then(|g| g.defects.get(process))
            .map_or(&[], Vec::as_slice)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in factory vocabulary.
pub static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    let pt_upt = GroupCatalog {
        models: strings(&[
            "PT850", "PT851", "PT852", "PT853", "PT863", "UPT852", "UPT853", "UPT860", "UPT861",
            "UPT862", "UPT863", "UPT313",
        ]),
        processes: strings(&[
            "1.코팅외관",
            "2.센서링 용접",
            "3.와이어본딩",
            "4.VCR 용접",
            "5.1차 헬륨",
            "6.레이저 용접",
            "7.절연(초기전류값)검사",
            "8.온도보상",
            "9.조정",
            "10.PLC 검사",
            "11.2차 헬륨",
            "12.에이징검사",
            "13.외관검사",
            "14.최종검사",
        ]),
        ranges: strings(&[
            "-15~30psi",
            "-15~60psi",
            "-15~100psi",
            "-15~160psi",
            "-15~200psi",
            "-15~250psi",
            "-15~300psi",
            "-15~350psi",
            "-15~500psi",
            "-15~1000psi",
            "-15~2000psi",
            "-15~3000psi",
            "-0.1~0.5MPa",
            "-0.1~1MPa",
            "0~0.5MPa",
            "0~1MPa",
            "-0.1~1.6MPa",
        ]),
        connection_types: strings(&[
            "Straight female",
            "Straight male",
            "Flow through female",
            "Flow through male",
            "Other",
        ]),
        sensor_thicknesses: strings(&["0.25T", "0.3T", "0.45T", "0.55T", "0.65T", "0.75T", "0.9T"]),
        versions: strings(&["1.5Ver", "2.0Ver"]),
        temp_equipments: strings(&["UPT#1", "UPT#2", "UPT#3", "UPT#4", "PT#1", "PT#2"]),
        aging_equipments: strings(&["NT-189", "NT-190", "NT-192", "NT-193", "WISE-1216"]),
        defects: HashMap::from([
            (
                "1.코팅외관".to_string(),
                strings(&[
                    "각도불량",
                    "글라스코팅두께불량",
                    "센서다이불량",
                    "칩긁힘",
                    "칩미부착",
                    "칩오염",
                    "칩파손",
                    "코팅깨짐",
                    "코팅오염",
                ]),
            ),
            (
                "8.온도보상".to_string(),
                strings(&[
                    "DAC 센서 불량",
                    "증폭 불량",
                    "통신 불량",
                    "전류출력 불량",
                    "값 고정",
                    "메인보드 불량",
                ]),
            ),
            (
                "12.에이징검사".to_string(),
                strings(&["0점불량", "기울기", "장기가압", "전류값이상", "초기값", "헌팅"]),
            ),
        ]),
    };

    let igs = GroupCatalog {
        models: strings(&["UPT900"]),
        processes: strings(&[
            "1.코팅외관",
            "2.블록 및 센서링 용접",
            "3.1차 헬륨",
            "4.2차 헬륨",
            "5.와이어본딩",
            "6.조립 및 절연검사",
            "7.온도보상",
            "8.조정",
            "9.자체 성능검사",
            "10.전원 on/off 검사",
            "11.자체 외관검사",
            "12.스위치 검사",
            "13.에이징검사",
            "14.QC 성능검사",
            "15.QC 외관검사",
        ]),
        ranges: strings(&["0~0.5MPa", "-0.1~0.5MPa"]),
        connection_types: strings(&["C-Seal", "W-Seal", "Other"]),
        sensor_thicknesses: strings(&["0.2T"]),
        versions: strings(&["1.5Ver", "2.0Ver"]),
        temp_equipments: strings(&["IGS#1", "IGS#2"]),
        aging_equipments: strings(&["에이징#1"]),
        defects: HashMap::from([
            (
                "1.코팅외관".to_string(),
                strings(&["코팅불량", "이물질", "스크래치"]),
            ),
            (
                "10.전원 on/off 검사".to_string(),
                strings(&["led 불량", "영점 불량"]),
            ),
        ]),
    };

    Catalog {
        groups: HashMap::from([(ModelGroup::PtUpt, pt_upt), (ModelGroup::Igs, igs)]),
        field_rules: vec![
            FieldRule {
                field: HeaderField::Version,
                name_markers: strings(&["와이어본딩"]),
                ordinal_prefixes: strings(&["5."]),
            },
            FieldRule {
                field: HeaderField::TempEquip,
                name_markers: strings(&["온도보상"]),
                ordinal_prefixes: strings(&["7."]),
            },
            FieldRule {
                field: HeaderField::AgingEquip,
                name_markers: strings(&["에이징"]),
                ordinal_prefixes: vec![],
            },
        ],
    }
});
