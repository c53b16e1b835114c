//! Generates API and page source files from a [`super::planner::Plan`].
//!
//! Grounded on `ai_orchestrator.py`'s `_generate_code_from_plan`: one coding
//! call per API/page at `temperature=0.3`, markdown fence stripping, and the
//! `backend/app/apis/<name>/__init__.py` / `frontend/src/pages/<Name>.tsx`
//! path convention.

use super::planner::{ApiSpec, PageSpec};
use crate::model::{ModelClient, ModelError, ModelMessage, ModelRequest};

const API_SYSTEM_PROMPT: &str =
    "You are an expert Python/FastAPI developer. Generate clean, production-ready code.";
const PAGE_SYSTEM_PROMPT: &str =
    "You are an expert React/TypeScript developer. Generate clean, production-ready code with beautiful UI.";

fn api_prompt(api: &ApiSpec) -> String {
    format!(
        "Generate a complete FastAPI endpoint file for:\n\n\
Endpoint: {} {}\n\
Description: {}\n\n\
Requirements:\n\
- Create router: router = APIRouter()\n\
- Include all necessary imports (FastAPI, Pydantic, asyncpg, os)\n\
- Define Pydantic request/response models\n\
- Implement the endpoint function with proper error handling\n\
- Use async/await for database operations\n\
- Include docstrings\n\
- Follow best practices\n\n\
Generate ONLY the Python code, no explanations.",
        api.method, api.endpoint, api.description
    )
}

fn page_prompt(page: &PageSpec) -> String {
    format!(
        "Generate a complete React/TypeScript page component for:\n\n\
Page Name: {}\n\
Route: {}\n\
Description: {}\n\n\
Requirements:\n\
- Use TypeScript with proper interfaces\n\
- Import React hooks (useState, useEffect)\n\
- Use apiClient from 'app' for API calls\n\
- Use shadcn/ui components from '@/components/ui/'\n\
- Include loading and error states\n\
- Use Tailwind CSS for styling\n\
- Export default the component\n\
- Follow modern React best practices\n\
- Make it look professional with proper layout\n\n\
Generate ONLY the TypeScript/React code, no explanations.",
        page.name, page.route, page.description
    )
}

/// Strips a leading/trailing ``` fence, and the language tag on the opening
/// fence line, from a model's code reply. Handles a tagged fence
/// (```python, ```typescript, ```tsx), a bare fence, or no fence at all.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.contains("```") {
        return trimmed.to_string();
    }

    let parts: Vec<&str> = trimmed.splitn(3, "```").collect();
    let body = if parts.len() >= 2 { parts[1] } else { trimmed };
    let mut body = body.trim_start_matches('\n');

    for tag in ["python", "typescript", "tsx", "javascript", "jsx", "sql"] {
        if let Some(rest) = body.strip_prefix(tag) {
            if rest.starts_with('\n') || rest.is_empty() {
                body = rest.trim_start_matches('\n');
            }
            break;
        }
    }

    body.trim().to_string()
}

fn api_name_from_endpoint(endpoint: &str) -> String {
    endpoint
        .trim_matches('/')
        .split('/')
        .next_back()
        .filter(|s| !s.is_empty())
        .unwrap_or("unnamed_api")
        .to_string()
}

pub fn api_file_path(api_name: &str) -> String {
    format!("backend/app/apis/{api_name}/__init__.py")
}

pub fn page_file_path(page_name: &str) -> String {
    format!("frontend/src/pages/{page_name}.tsx")
}

/// Returns `(api_name, generated_code)`.
pub async fn generate_api_code(model: &dyn ModelClient, api: &ApiSpec) -> Result<(String, String), ModelError> {
    let api_name = api_name_from_endpoint(&api.endpoint);
    let request = ModelRequest::new(API_SYSTEM_PROMPT, vec![ModelMessage::user(api_prompt(api))])
        .with_temperature(0.3);
    let completion = model.complete(request).await?;
    Ok((api_name, strip_code_fences(&completion.text)))
}

pub async fn generate_page_code(model: &dyn ModelClient, page: &PageSpec) -> Result<String, ModelError> {
    let request = ModelRequest::new(PAGE_SYSTEM_PROMPT, vec![ModelMessage::user(page_prompt(page))])
        .with_temperature(0.3);
    let completion = model.complete(request).await?;
    Ok(strip_code_fences(&completion.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MockModelClient, ModelCompletion};

    #[test]
    fn strips_python_fence() {
        let raw = "```python\ndef handler():\n    pass\n```";
        assert_eq!(strip_code_fences(raw), "def handler():\n    pass");
    }

    #[test]
    fn strips_tsx_fence() {
        let raw = "```tsx\nexport default function Page() { return null }\n```";
        assert_eq!(strip_code_fences(raw), "export default function Page() { return null }");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\nconst x = 1;\n```";
        assert_eq!(strip_code_fences(raw), "const x = 1;");
    }

    #[test]
    fn passes_through_unfenced_text() {
        assert_eq!(strip_code_fences("plain code, no fences"), "plain code, no fences");
    }

    #[test]
    fn api_name_extracted_from_endpoint() {
        assert_eq!(api_name_from_endpoint("/api/todos"), "todos");
        assert_eq!(api_name_from_endpoint("/"), "unnamed_api");
    }

    #[tokio::test]
    async fn generates_api_code_and_strips_fences() {
        let client = MockModelClient::new(vec![ModelCompletion {
            text: "```python\nrouter = APIRouter()\n```".into(),
            ..Default::default()
        }]);
        let api = ApiSpec { method: "GET".into(), endpoint: "/api/todos".into(), description: "list todos".into() };
        let (name, code) = generate_api_code(&client, &api).await.unwrap();
        assert_eq!(name, "todos");
        assert_eq!(code, "router = APIRouter()");
    }

    #[tokio::test]
    async fn generates_page_code_and_strips_fences() {
        let client = MockModelClient::new(vec![ModelCompletion {
            text: "```tsx\nexport default function TodoList() { return null }\n```".into(),
            ..Default::default()
        }]);
        let page = PageSpec { name: "TodoList".into(), route: "/todos".into(), description: "main page".into() };
        let code = generate_page_code(&client, &page).await.unwrap();
        assert_eq!(code, "export default function TodoList() { return null }");
    }

    #[test]
    fn file_path_helpers_match_workspace_conventions() {
        assert_eq!(api_file_path("todos"), "backend/app/apis/todos/__init__.py");
        assert_eq!(page_file_path("TodoList"), "frontend/src/pages/TodoList.tsx");
    }
}
