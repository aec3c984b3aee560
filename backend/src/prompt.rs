//! Prompt construction for both generation endpoints.
//!
//! - `build_copy_prompt`: sectioned marketing copy, streamed to the client
//! - `build_quote_prompt`: single JSON quote table for the spreadsheet view
//! - `category_guidance`: fixed per-category domain notes

use crate::models::GenerationRequest;
use crate::persona::PersonaTag;

// ═══════════════════════════════════════════════════════════════════════
//  Category guidance
// ═══════════════════════════════════════════════════════════════════════

/// Section titles, in output order. The client splits on these.
pub const SECTION_TITLES: [&str; 5] = [
    "[1] 후킹 헤드라인",
    "[2] 공감 스토리",
    "[3] 상품 핵심 포인트",
    "[4] 자주 묻는 질문",
    "[5] 상담 유도 문구",
];

const CATEGORY_GUIDANCE: &[(&str, &str)] = &[
    (
        "상속/증여",
        "상속세·증여세 재원 마련 관점에서 설명하세요. 10년 단위 증여공제 한도, 종신보험을 활용한 상속세 납부 재원 확보, 수익자 지정의 중요성을 다루세요. 특정 절세 금액을 단정하지 마세요.",
    ),
    (
        "암보험",
        "진단비, 수술비, 항암치료비 보장 구조를 설명하세요. 소액암·유사암 구분과 면책기간(90일), 감액기간을 반드시 언급하세요.",
    ),
    (
        "실손보험",
        "실제 부담한 의료비를 보상하는 구조와 자기부담금, 세대별 상품 차이, 비급여 항목 보장 변화를 설명하세요. 중복 가입 시 비례보상 원칙을 언급하세요.",
    ),
    (
        "종신보험",
        "사망보장의 평생 유지, 해지환급금 구조, 납입기간과 보험료 수준의 관계를 설명하세요. 저축성 상품으로 오인하지 않도록 주의 문구를 넣으세요.",
    ),
    (
        "연금보험",
        "노후 소득 공백기, 연금 개시 연령 선택, 10년 이상 유지 시 비과세 요건을 설명하세요. 공시이율 변동 가능성을 언급하세요.",
    ),
    (
        "어린이보험",
        "성장기 질병·상해, 자녀 배상책임, 만기 설정(30세/100세) 차이를 설명하세요. 태아 가입 시 유의사항을 다루세요.",
    ),
    (
        "운전자보험",
        "교통사고 처리지원금, 벌금, 변호사 선임비용 보장을 설명하세요. 자동차보험과의 차이를 분명히 하세요.",
    ),
    (
        "치매/간병",
        "경도·중등도·중증 치매 단계별 보장, 장기요양등급과 간병인 지원 일당을 설명하세요. 가족의 간병 부담을 공감 포인트로 삼으세요.",
    ),
];

/// Domain notes for a known category. Unknown categories get none.
pub fn category_guidance(category: &str) -> Option<&'static str> {
    let category = category.trim();
    CATEGORY_GUIDANCE
        .iter()
        .find(|(name, _)| *name == category)
        .map(|(_, guidance)| *guidance)
}

// ═══════════════════════════════════════════════════════════════════════
//  Copy prompt (streaming endpoint)
// ═══════════════════════════════════════════════════════════════════════

/// Build the marketing-copy prompt. Pure and deterministic.
pub fn build_copy_prompt(req: &GenerationRequest, persona: &PersonaTag, line_break: &str) -> String {
    let mut lines = vec![
        "당신은 한국 보험 설계사를 돕는 마케팅 카피라이터입니다.".to_string(),
        "아래 고객 정보를 바탕으로 블로그·SNS에 바로 게시할 수 있는 보험 마케팅 콘텐츠를 작성하세요.".to_string(),
        String::new(),
        "## 고객 정보".to_string(),
        format!("- 타겟: {}", req.target.trim()),
        format!("- 페르소나: {}", persona.describe()),
        format!("- 보험 종류: {}", req.insurance_type.trim()),
        format!("- 고객 고민: {}", req.concern.trim()),
    ];

    if let Some(guidance) = category_guidance(&req.insurance_type) {
        lines.extend([String::new(), "## 상품 가이드".to_string(), guidance.to_string()]);
    }

    lines.extend([
        String::new(),
        "## 작성 규칙".to_string(),
        format!("- {}의 말투와 생활 상황에 맞춰 공감형으로 작성하세요.", persona.describe()),
        "- 과장 광고, 수익 보장, 확정 수익률 표현은 금지합니다.".to_string(),
        "- 마크다운 표(| 문자)와 코드 블록을 절대 사용하지 마세요.".to_string(),
        format!("- 줄바꿈이 필요한 곳에는 반드시 {} 를 사용하세요.", line_break),
        "- 영어 라벨(Headline, Body, CTA 등)을 붙이지 마세요.".to_string(),
        String::new(),
        "## 출력 형식".to_string(),
        "다음 섹션을 순서대로, 제목을 그대로 사용해 작성하세요:".to_string(),
    ]);
    lines.extend(SECTION_TITLES.iter().map(|t| t.to_string()));

    lines.join("\n")
}

// ═══════════════════════════════════════════════════════════════════════
//  Quote prompt (structured endpoint)
// ═══════════════════════════════════════════════════════════════════════

/// Build the prompt asking for one JSON quote table.
pub fn build_quote_prompt(req: &GenerationRequest, persona: &PersonaTag) -> String {
    let mut lines = vec![
        "당신은 보험 설계 견적 시뮬레이터입니다.".to_string(),
        format!(
            "{} 고객({})에게 제안할 '{}' 모의 견적표를 만드세요.",
            persona.describe(),
            req.target.trim(),
            req.insurance_type.trim()
        ),
        format!("고객 고민: {}", req.concern.trim()),
    ];

    if let Some(guidance) = category_guidance(&req.insurance_type) {
        lines.push(format!("참고: {}", guidance));
    }

    lines.extend([
        String::new(),
        "설명 없이 아래 형식의 JSON 객체 하나만 출력하세요:".to_string(),
        r#"{"product":"상품명","company":"보험사명","items":[{"name":"보장 항목","amount":"가입금액","premium":"월 보험료"}],"total":"월 보험료 합계"}"#.to_string(),
        "- items는 4~7개로 구성하세요.".to_string(),
        "- 금액은 '3,000만원', '12,500원'처럼 단위를 포함한 문자열로 쓰세요.".to_string(),
    ]);

    lines.join("\n")
}
