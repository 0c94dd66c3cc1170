// Mounts and record types spread over several Go modules
use openapi_from_annotations::error::Error;
use openapi_from_annotations::pipeline::{self, Config, OutputFormat};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const MAIN: &str = r#"package main

// @title Zoo
// @ver 2.0
func main() {
	r := mux.NewRouter()
	mount(r)
}
"#;

const ROUTES: &str = r#"package main

func mount(r *mux.Router) {
	// @router v1
	v1 := r.PathPrefix("/v1").Subrouter()
	pets.Register(v1)
	toys.Register(v1)
}
"#;

const PETS_HANDLER: &str = r#"package pets

import (
	"net/http"

	"github.com/acme/zoo/pets/model"
	"github.com/gorilla/mux"
)

func Register(v1 *mux.Router) {
	// @router pets
	// @subrouter v1
	p := v1.PathPrefix("/pets").Subrouter()

	// @summary List pets
	// @produce json
	// @success 200 {object} []model.Item Pets
	// @subrouter pets
	p.HandleFunc("/", List).Methods("GET")
}
"#;

const TOYS_HANDLER: &str = r#"package toys

import (
	"net/http"

	toy "github.com/acme/zoo/toys/model"
	"github.com/gorilla/mux"
)

func Register(v1 *mux.Router) {
	// @router toys
	// @subrouter v1
	t := v1.PathPrefix("/toys").Subrouter()

	// @summary Get a toy
	// @produce json
	// @success 200 {object} toy.Item Toy
	// @subrouter toys
	t.HandleFunc("/{sku}", Get).Methods("GET")

	// @summary Restock
	// @router /restock [post]
	// @subrouter toys
	t.HandleFunc("/refill", Restock)
}
"#;

const PET_MODEL: &str = r#"package model

type Item struct {
	Name string `json:"name"`
}
"#;

const TOY_MODEL: &str = r#"package model

type Item struct {
	// Stock keeping unit
	Sku string `json:"sku" required:"true"`
}
"#;

/// Helper function to create a temporary Go source tree
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write test file");
    }

    temp_dir
}

fn zoo_config(temp_dir: &TempDir) -> Config {
    let project = temp_dir.path().join("github.com/acme/zoo");
    Config {
        main_file: project.join("main.go"),
        endpoints_root: project.clone(),
        output_dir: temp_dir.path().join("out"),
        source_root: temp_dir.path().to_path_buf(),
        format: OutputFormat::Yaml,
        verbose: false,
    }
}

fn zoo_project(routes: &str) -> TempDir {
    create_test_project(vec![
        ("github.com/acme/zoo/main.go", MAIN),
        ("github.com/acme/zoo/routes.go", routes),
        ("github.com/acme/zoo/pets/handler.go", PETS_HANDLER),
        ("github.com/acme/zoo/pets/model/item.go", PET_MODEL),
        ("github.com/acme/zoo/toys/handler.go", TOYS_HANDLER),
        ("github.com/acme/zoo/toys/model/item.go", TOY_MODEL),
    ])
}

#[test]
fn test_mounts_across_files() {
    let temp_dir = zoo_project(ROUTES);
    let document = pipeline::build_document(&zoo_config(&temp_dir)).expect("Failed to generate");

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&document).expect("Generated YAML should be valid");
    let paths = parsed["paths"].as_mapping().expect("paths should be a mapping");
    let urls: Vec<&str> = paths.keys().filter_map(|k| k.as_str()).collect();
    assert_eq!(urls, vec!["/v1/pets/", "/v1/toys/{sku}", "/v1/toys/restock"]);

    let get_toy = &parsed["paths"]["/v1/toys/{sku}"]["get"];
    assert_eq!(get_toy["parameters"][0]["name"].as_str(), Some("sku"));
    assert_eq!(get_toy["parameters"][0]["in"].as_str(), Some("path"));
}

#[test]
fn test_explicit_router_wins_over_registration_call() {
    let temp_dir = zoo_project(ROUTES);
    let document = pipeline::build_document(&zoo_config(&temp_dir)).expect("Failed to generate");

    assert!(document.contains("  /v1/toys/restock:\n    post:\n      summary: Restock\n"));
    assert!(!document.contains("refill"));
}

#[test]
fn test_same_type_name_in_two_modules() {
    let temp_dir = zoo_project(ROUTES);
    let document = pipeline::build_document(&zoo_config(&temp_dir)).expect("Failed to generate");

    let parsed: serde_yaml::Value =
        serde_yaml::from_str(&document).expect("Generated YAML should be valid");
    let schemas = &parsed["components"]["schemas"];
    assert_eq!(schemas["Item"]["properties"]["name"]["type"].as_str(), Some("string"));
    assert_eq!(schemas["Item1"]["required"][0].as_str(), Some("sku"));
    assert_eq!(
        schemas["Item1"]["properties"]["sku"]["description"].as_str(),
        Some("Stock keeping unit")
    );

    let pets = &parsed["paths"]["/v1/pets/"]["get"]["responses"]["200"];
    assert_eq!(
        pets["content"]["application/json"]["schema"]["items"]["$ref"].as_str(),
        Some("#/components/schemas/Item")
    );
    let toy = &parsed["paths"]["/v1/toys/{sku}"]["get"]["responses"]["200"];
    assert_eq!(
        toy["content"]["application/json"]["schema"]["$ref"].as_str(),
        Some("#/components/schemas/Item1")
    );
}

#[test]
fn test_mount_cycle_across_files_is_an_error() {
    let cyclic_routes = r#"package main

func mount(r *mux.Router) {
	// @router v1
	// @subrouter pets
	v1 := r.PathPrefix("/v1").Subrouter()
}
"#;
    let temp_dir = zoo_project(cyclic_routes);

    let err = pipeline::build_document(&zoo_config(&temp_dir)).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::SubrouterCycle(_))));
}
