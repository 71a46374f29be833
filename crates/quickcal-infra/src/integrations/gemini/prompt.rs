//! Japanese prompt construction for the interpretation gateway.
//!
//! Both prompts pin the output to a JSON-only schema and anchor relative
//! date expressions to the provided "now" in the configured timezone.

use quickcal_core::{InterpretRequest, RefineRequest};

const DRAFT_JSON_SCHEMA: &str = r#"{
  "title": "string",
  "start": "YYYY-MM-DDTHH:mm:ss or empty",
  "end": "YYYY-MM-DDTHH:mm:ss or empty",
  "location": "string",
  "description": "string",
  "confidence": 0.0,
  "uncertain": false,
  "needsClarification": false,
  "clarificationQuestion": "string",
  "reasoning": "string"
}"#;

const OCR_DIRECTIVE_INTERPRET: &str =
    "- 添付画像内の文字情報を読み取り（OCR）、入力文と統合して解釈する。\n";
const OCR_DIRECTIVE_REFINE: &str =
    "- 添付画像内の文字情報を読み取り（OCR）、回答文と統合して補完する。\n";

fn or_none(value: &str) -> &str {
    if value.trim().is_empty() {
        "(なし)"
    } else {
        value
    }
}

pub fn build_interpret_prompt(request: &InterpretRequest, now_local: &str) -> String {
    let ocr = if request.images.is_empty() { "" } else { OCR_DIRECTIVE_INTERPRET };
    format!(
        "あなたは予定抽出アシスタントです。入力文からGoogleカレンダー予定を抽出してください。\n\
         \n\
         制約:\n\
         - 出力はJSONのみ。\n\
         - 日時は {timezone} として解釈。\n\
         - 相対表現（今日/明日/来週など）は現在日時 {now_local} を基準に解釈。\n\
         - start/end は \"YYYY-MM-DDTHH:mm:ss\" 形式のローカル時刻。\n\
         - title/start/end が不足する場合は needsClarification=true。\n\
         - 曖昧な場合は clarificationQuestion を1つだけ日本語で返す。\n\
         - 終了時刻未指定の場合、既定は {duration} 分。\n\
         - ユーザー定義ルールを優先する。\n\
         {ocr}\
         \n\
         ユーザー定義ルール:\n\
         {rules}\n\
         \n\
         カスタム指示:\n\
         {instruction}\n\
         \n\
         入力文:\n\
         {text}\n\
         \n\
         JSONスキーマ:\n\
         {schema}",
        timezone = request.settings.timezone,
        now_local = now_local,
        duration = request.settings.default_duration_minutes,
        ocr = ocr,
        rules = or_none(&request.settings.time_resolution_rules),
        instruction = or_none(&request.instruction_text),
        text = or_none(&request.text),
        schema = DRAFT_JSON_SCHEMA,
    )
}

pub fn build_refine_prompt(request: &RefineRequest, now_local: &str) -> String {
    let ocr = if request.images.is_empty() { "" } else { OCR_DIRECTIVE_REFINE };
    let draft_json =
        serde_json::to_string_pretty(&request.draft).unwrap_or_else(|_| "{}".to_string());
    format!(
        "あなたは予定抽出アシスタントです。既存ドラフトと追加回答を反映して予定情報を更新してください。\n\
         \n\
         制約:\n\
         - 出力はJSONのみ。\n\
         - 日時は {timezone} として解釈。\n\
         - 相対表現（今日/明日/来週など）は現在日時 {now_local} を基準に解釈。\n\
         - start/end は \"YYYY-MM-DDTHH:mm:ss\" 形式のローカル時刻。\n\
         - 必須情報不足時は needsClarification=true。\n\
         - clarificationQuestion は次に必要な質問を1つだけ日本語で返す。\n\
         {ocr}\
         \n\
         ユーザー定義ルール:\n\
         {rules}\n\
         \n\
         カスタム指示:\n\
         {instruction}\n\
         \n\
         現在のドラフト:\n\
         {draft}\n\
         \n\
         直前の質問:\n\
         {question}\n\
         \n\
         ユーザー回答:\n\
         {answer}\n\
         \n\
         JSONスキーマ:\n\
         {schema}",
        timezone = request.settings.timezone,
        now_local = now_local,
        ocr = ocr,
        rules = or_none(&request.settings.time_resolution_rules),
        instruction = or_none(&request.instruction_text),
        draft = draft_json,
        question = request.question,
        answer = or_none(&request.answer),
        schema = DRAFT_JSON_SCHEMA,
    )
}
