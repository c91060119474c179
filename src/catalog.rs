use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProductOption {
    pub value: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const PRODUCT_OPTIONS: &[ProductOption] = &[
    ProductOption {
        value: "basic_bioceramic",
        label: "기본형 바이오세라믹",
        description: "결로 방지 및 항곰팡이 기본 성능",
    },
    ProductOption {
        value: "world_class",
        label: "고급형 월드클래스",
        description: "내곰팡이성, 중금속 불검출 인증",
    },
    ProductOption {
        value: "premium_zerostop",
        label: "프리미엄 제로스탑",
        description: "내곰팡이성, 결로 예방 성능 인증",
    },
    ProductOption {
        value: "general_elastic",
        label: "일반탄성",
        description: "가성비 도장 시공",
    },
];

pub const ISSUE_TAGS: &[&str] = &[
    "#곰팡이발생",
    "#균열발생/벽지",
    "#진동발생",
    "#벽_박리",
    "#구축인테리어",
    "#결로현상",
    "#도장면박리",
    "#벽면손상",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub products: &'static [ProductOption],
    pub issue_tags: &'static [&'static str],
}

pub fn catalog() -> Catalog {
    Catalog {
        products: PRODUCT_OPTIONS,
        issue_tags: ISSUE_TAGS,
    }
}
