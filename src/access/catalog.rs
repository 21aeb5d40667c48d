use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// The fixed capability catalog.
///
/// Tokens are opaque strings on the wire and in the `accounts.permissions`
/// column, but inside the process they only exist as this enum: anything not
/// in the catalog is rejected or dropped at the parsing boundary and cannot
/// reach a capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PeopleViewAll,
    PeopleViewSelf,
    PeopleEditAll,
    PeopleEditSelf,
    PeopleCreate,
    PeopleDelete,
    DimensionsEditAll,
    DimensionsEditSelf,
    GrowthViewAll,
    GrowthViewSelf,
    GrowthEditAll,
    GrowthEditSelf,
    CertificatesUpload,
    CertificatesDelete,
    MeetingsManage,
    EvaluationsManage,
    SensitiveView,
    ImportRun,
    ExportRun,
    AccountsManage,
}

impl Capability {
    /// Catalog order. Display surfaces (whoami, admin grant forms) list
    /// capabilities in this order.
    pub const ALL: [Capability; 20] = [
        Capability::PeopleViewAll,
        Capability::PeopleViewSelf,
        Capability::PeopleEditAll,
        Capability::PeopleEditSelf,
        Capability::PeopleCreate,
        Capability::PeopleDelete,
        Capability::DimensionsEditAll,
        Capability::DimensionsEditSelf,
        Capability::GrowthViewAll,
        Capability::GrowthViewSelf,
        Capability::GrowthEditAll,
        Capability::GrowthEditSelf,
        Capability::CertificatesUpload,
        Capability::CertificatesDelete,
        Capability::MeetingsManage,
        Capability::EvaluationsManage,
        Capability::SensitiveView,
        Capability::ImportRun,
        Capability::ExportRun,
        Capability::AccountsManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::PeopleViewAll => "people.view.all",
            Capability::PeopleViewSelf => "people.view.self",
            Capability::PeopleEditAll => "people.edit.all",
            Capability::PeopleEditSelf => "people.edit.self",
            Capability::PeopleCreate => "people.create",
            Capability::PeopleDelete => "people.delete",
            Capability::DimensionsEditAll => "dimensions.edit.all",
            Capability::DimensionsEditSelf => "dimensions.edit.self",
            Capability::GrowthViewAll => "growth.view.all",
            Capability::GrowthViewSelf => "growth.view.self",
            Capability::GrowthEditAll => "growth.edit.all",
            Capability::GrowthEditSelf => "growth.edit.self",
            Capability::CertificatesUpload => "certificates.upload",
            Capability::CertificatesDelete => "certificates.delete",
            Capability::MeetingsManage => "meetings.manage",
            Capability::EvaluationsManage => "evaluations.manage",
            Capability::SensitiveView => "sensitive.view",
            Capability::ImportRun => "import.run",
            Capability::ExportRun => "export.run",
            Capability::AccountsManage => "accounts.manage",
        }
    }

    /// Human label shown in admin surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            Capability::PeopleViewAll => "查看全部人员",
            Capability::PeopleViewSelf => "查看本人档案",
            Capability::PeopleEditAll => "编辑全部人员",
            Capability::PeopleEditSelf => "编辑本人档案",
            Capability::PeopleCreate => "新增人员",
            Capability::PeopleDelete => "删除人员",
            Capability::DimensionsEditAll => "编辑全部画像",
            Capability::DimensionsEditSelf => "编辑本人画像",
            Capability::GrowthViewAll => "查看全部成长记录",
            Capability::GrowthViewSelf => "查看本人成长记录",
            Capability::GrowthEditAll => "编辑全部成长记录",
            Capability::GrowthEditSelf => "编辑本人成长记录",
            Capability::CertificatesUpload => "上传证书",
            Capability::CertificatesDelete => "删除证书",
            Capability::MeetingsManage => "管理会议",
            Capability::EvaluationsManage => "管理评价",
            Capability::SensitiveView => "查看敏感信息",
            Capability::ImportRun => "批量导入",
            Capability::ExportRun => "批量导出",
            Capability::AccountsManage => "管理账号",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown capability token: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

impl Serialize for Capability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Capability {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Normalize a stored permission blob into a typed set.
///
/// Unknown tokens are dropped with a warning. This runs once, when the actor
/// is loaded; capability checks never see raw strings.
pub fn normalize_tokens(raw: &[String]) -> HashSet<Capability> {
    let mut set = HashSet::with_capacity(raw.len());
    for token in raw {
        match token.parse::<Capability>() {
            Ok(cap) => {
                set.insert(cap);
            }
            Err(_) => {
                warn!("dropping unknown capability token from stored permissions: {}", token);
            }
        }
    }
    set
}

/// Validate an explicit grant list. Unlike `normalize_tokens`, unknown tokens
/// are an error here: an admin typing a bad token should hear about it.
pub fn validate_tokens(raw: &[String]) -> Result<HashSet<Capability>, Vec<String>> {
    let mut set = HashSet::with_capacity(raw.len());
    let mut unknown = Vec::new();
    for token in raw {
        match token.parse::<Capability>() {
            Ok(cap) => {
                set.insert(cap);
            }
            Err(_) => unknown.push(token.clone()),
        }
    }
    if unknown.is_empty() {
        Ok(set)
    } else {
        Err(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_through_the_catalog() {
        for cap in Capability::ALL {
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
    }

    #[test]
    fn normalize_drops_unknown_tokens() {
        let raw = vec![
            "people.view.self".to_string(),
            "made.up.token".to_string(),
            "sensitive.view".to_string(),
        ];
        let set = normalize_tokens(&raw);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Capability::PeopleViewSelf));
        assert!(set.contains(&Capability::SensitiveView));
    }

    #[test]
    fn validate_rejects_unknown_tokens() {
        let raw = vec!["people.view.self".to_string(), "nope".to_string()];
        let err = validate_tokens(&raw).unwrap_err();
        assert_eq!(err, vec!["nope".to_string()]);
    }
}
