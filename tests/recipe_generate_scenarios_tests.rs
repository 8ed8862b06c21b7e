//! End-to-end scenarios over `recipe_generate`: a target that resolves to
//! a real controller route, one that falls back to actuated mode, and
//! the guardrail that refuses an unrelated textual match.

use probeplan::planner::tool_surface::{recipe_generate, RecipeGenerateRequest};
use std::io::Write;
use tempfile::tempdir;

fn write(dir: &std::path::Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

#[test]
fn query_param_controller_route_produces_a_natural_plan() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "src/com/example/catalog/CatalogController.java",
        r#"
package com.example.catalog;

@RestController
@RequestMapping("/catalog")
public class CatalogController {
    @GetMapping("/items")
    public List<Item> search(@RequestParam("keyword") String keyword) {
        return service.search(keyword);
    }
}
"#,
    );
    write(
        dir.path(),
        "src/com/example/catalog/CatalogService.java",
        r#"
package com.example.catalog;

public class CatalogService {
    public List<Item> search(String keyword) {
        return repository.findByKeyword(keyword);
    }
}
"#,
    );

    let response = recipe_generate(&RecipeGenerateRequest {
        project_root: dir.path().to_path_buf(),
        class_hint: Some("CatalogService".to_string()),
        method_hint: Some("search".to_string()),
        line_hint: None,
        username: None,
        password: None,
        auth_token: None,
    });

    assert!(response.target.is_some());
    assert!(
        response.request_candidate.is_some(),
        "expected a request candidate via the caller-BFS from the controller"
    );
    assert_eq!(response.plan_mode, "natural");
}

#[test]
fn guardrail_refuses_an_unrelated_textual_hint() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "src/com/example/UnrelatedRepository.java",
        "package com.example;\n\nclass UnrelatedRepository {\n    void someOtherMethod() {\n    }\n}\n",
    );

    let response = recipe_generate(&RecipeGenerateRequest {
        project_root: dir.path().to_path_buf(),
        class_hint: Some("UnrelatedRepository".to_string()),
        method_hint: Some("notTheMethod".to_string()),
        line_hint: Some(4),
        username: None,
        password: None,
        auth_token: None,
    });

    assert!(
        response.target.is_none(),
        "a line hint alone must not rescue a textual hint that matched nothing"
    );
    assert_eq!(response.plan_mode, "actuated");
    assert!(response.steps.is_empty());
}

#[test]
fn line_level_target_without_a_controller_falls_back_to_actuated_mode() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "src/com/example/PricingEngine.java",
        "package com.example;\n\nclass PricingEngine {\n    boolean isEligible(int amount) {\n        return amount > 0;\n    }\n}\n",
    );

    let response = recipe_generate(&RecipeGenerateRequest {
        project_root: dir.path().to_path_buf(),
        class_hint: Some("PricingEngine".to_string()),
        method_hint: Some("isEligible".to_string()),
        line_hint: Some(4),
        username: None,
        password: None,
        auth_token: None,
    });

    assert_eq!(response.plan_mode, "actuated");
    let phases: Vec<&str> = response.steps.iter().map(|s| s.phase.as_str()).collect();
    assert_eq!(phases, vec!["prepare", "verify", "cleanup"]);
}
