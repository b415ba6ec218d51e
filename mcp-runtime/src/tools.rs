//! The fixed tool registry and typed tool inputs.

use bakul_core::validation::{
    self, DATASET_NAME_MAX_LEN, DATASET_NAME_MIN_LEN, PASSWORD_MAX_LEN, PASSWORD_MIN_LEN,
    USERNAME_MAX_LEN, USERNAME_MIN_LEN, USERNAME_PATTERN, ValidationError,
};
use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    HealthCheck,
    RegisterUser,
    RotateApiKey,
    CreateDataset,
    UpdateDataset,
    GetPublicDataset,
    GetPublicDatasetSchema,
    GetApiKeyStatus,
}

impl ToolName {
    /// Declaration order, which is also the discovery order.
    pub const ALL: [ToolName; 8] = [
        ToolName::HealthCheck,
        ToolName::RegisterUser,
        ToolName::RotateApiKey,
        ToolName::CreateDataset,
        ToolName::UpdateDataset,
        ToolName::GetPublicDataset,
        ToolName::GetPublicDatasetSchema,
        ToolName::GetApiKeyStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::HealthCheck => "health_check",
            ToolName::RegisterUser => "register_user",
            ToolName::RotateApiKey => "rotate_api_key",
            ToolName::CreateDataset => "create_dataset",
            ToolName::UpdateDataset => "update_dataset",
            ToolName::GetPublicDataset => "get_public_dataset",
            ToolName::GetPublicDatasetSchema => "get_public_dataset_schema",
            ToolName::GetApiKeyStatus => "get_api_key_status",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == raw)
    }

    pub fn requires_auth(self) -> bool {
        matches!(
            self,
            ToolName::RotateApiKey | ToolName::CreateDataset | ToolName::UpdateDataset
        )
    }
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name.as_str(),
            "title": self.title,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

fn empty_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

fn dataset_ref_schema(dataset_description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "username": { "type": "string", "description": "Username of the dataset owner" },
            "dataset_id": { "type": "string", "description": dataset_description }
        },
        "required": ["username", "dataset_id"]
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ToolName::HealthCheck,
            title: "Health Check",
            description: "Check the health status of the Bakul API",
            input_schema: empty_schema(),
        },
        ToolDefinition {
            name: ToolName::RegisterUser,
            title: "Register User",
            description: "Register a new user account with the Bakul API",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "username": {
                        "type": "string",
                        "minLength": USERNAME_MIN_LEN,
                        "maxLength": USERNAME_MAX_LEN,
                        "pattern": USERNAME_PATTERN,
                        "description": "Username (3-50 chars, alphanumeric, underscore, dash only)"
                    },
                    "password": {
                        "type": "string",
                        "minLength": PASSWORD_MIN_LEN,
                        "maxLength": PASSWORD_MAX_LEN,
                        "description": "Password (8-100 chars)"
                    }
                },
                "required": ["username", "password"]
            }),
        },
        ToolDefinition {
            name: ToolName::RotateApiKey,
            title: "Rotate API Key",
            description: "Rotate the API key for authenticated access",
            input_schema: empty_schema(),
        },
        ToolDefinition {
            name: ToolName::CreateDataset,
            title: "Create Dataset",
            description: "Create a new dataset in the Bakul API",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "minLength": DATASET_NAME_MIN_LEN,
                        "maxLength": DATASET_NAME_MAX_LEN,
                        "description": "Dataset name (1-100 chars)"
                    },
                    "data": {
                        "description": "JSON data (max 5MB) - schema will be auto-generated"
                    }
                },
                "required": ["name"]
            }),
        },
        ToolDefinition {
            name: ToolName::UpdateDataset,
            title: "Update Dataset",
            description: "Update an existing dataset in the Bakul API",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "dataset_id": { "type": "string", "description": "ID of the dataset to update" },
                    "data": {
                        "description": "Updated JSON data (max 5MB) - schema will be auto-generated"
                    }
                },
                "required": ["dataset_id", "data"]
            }),
        },
        ToolDefinition {
            name: ToolName::GetPublicDataset,
            title: "Get Public Dataset",
            description: "Retrieve a public dataset by username and dataset ID",
            input_schema: dataset_ref_schema("ID of the public dataset"),
        },
        ToolDefinition {
            name: ToolName::GetPublicDatasetSchema,
            title: "Get Public Dataset Schema",
            description: "Retrieve the schema of a public dataset",
            input_schema: dataset_ref_schema("ID of the public dataset"),
        },
        ToolDefinition {
            name: ToolName::GetApiKeyStatus,
            title: "Get API Key Status",
            description: "Check if API key is configured and test authentication",
            input_schema: empty_schema(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterUserInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDatasetInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDatasetInput {
    pub dataset_id: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRef {
    pub username: String,
    pub dataset_id: String,
}

/// A validated invocation of one tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    HealthCheck,
    RegisterUser(RegisterUserInput),
    RotateApiKey,
    CreateDataset(CreateDatasetInput),
    UpdateDataset(UpdateDatasetInput),
    GetPublicDataset(DatasetRef),
    GetPublicDatasetSchema(DatasetRef),
    GetApiKeyStatus,
}

impl ToolCall {
    /// Checks raw arguments against the tool's contract. Unknown extra keys are ignored.
    pub fn from_args(tool: ToolName, args: &Map<String, Value>) -> Result<Self, ValidationError> {
        Ok(match tool {
            ToolName::HealthCheck => ToolCall::HealthCheck,
            ToolName::RotateApiKey => ToolCall::RotateApiKey,
            ToolName::GetApiKeyStatus => ToolCall::GetApiKeyStatus,
            ToolName::RegisterUser => {
                let username = validation::required_string(args, "username")?;
                validation::validate_username("username", &username)?;
                let password = validation::required_string(args, "password")?;
                validation::validate_password("password", &password)?;
                ToolCall::RegisterUser(RegisterUserInput { username, password })
            }
            ToolName::CreateDataset => {
                let name = validation::required_string(args, "name")?;
                validation::validate_dataset_name("name", &name)?;
                let data = validation::optional_value(args, "data");
                if let Some(data) = &data {
                    validation::validate_dataset_data("data", data)?;
                }
                ToolCall::CreateDataset(CreateDatasetInput { name, data })
            }
            ToolName::UpdateDataset => {
                let dataset_id = validation::required_string(args, "dataset_id")?;
                let data = validation::required_value(args, "data")?;
                validation::validate_dataset_data("data", &data)?;
                ToolCall::UpdateDataset(UpdateDatasetInput { dataset_id, data })
            }
            ToolName::GetPublicDataset => ToolCall::GetPublicDataset(dataset_ref(args)?),
            ToolName::GetPublicDatasetSchema => {
                ToolCall::GetPublicDatasetSchema(dataset_ref(args)?)
            }
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            ToolCall::HealthCheck => ToolName::HealthCheck,
            ToolCall::RegisterUser(_) => ToolName::RegisterUser,
            ToolCall::RotateApiKey => ToolName::RotateApiKey,
            ToolCall::CreateDataset(_) => ToolName::CreateDataset,
            ToolCall::UpdateDataset(_) => ToolName::UpdateDataset,
            ToolCall::GetPublicDataset(_) => ToolName::GetPublicDataset,
            ToolCall::GetPublicDatasetSchema(_) => ToolName::GetPublicDatasetSchema,
            ToolCall::GetApiKeyStatus => ToolName::GetApiKeyStatus,
        }
    }
}

fn dataset_ref(args: &Map<String, Value>) -> Result<DatasetRef, ValidationError> {
    Ok(DatasetRef {
        username: validation::required_string(args, "username")?,
        dataset_id: validation::required_string(args, "dataset_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn registry_lists_tools_in_declaration_order() {
        let names: Vec<&str> = tool_definitions()
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "health_check",
                "register_user",
                "rotate_api_key",
                "create_dataset",
                "update_dataset",
                "get_public_dataset",
                "get_public_dataset_schema",
                "get_api_key_status",
            ]
        );
    }

    #[test]
    fn tool_names_are_unique_and_parse_back() {
        let mut seen = HashSet::new();
        for tool in ToolName::ALL {
            assert!(seen.insert(tool.as_str()), "duplicate tool {}", tool.as_str());
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::parse("drop_database"), None);
    }

    #[test]
    fn descriptors_serialize_with_title_and_object_schema() {
        for tool in tool_definitions() {
            let value = tool.to_value();
            assert!(!value["title"].as_str().unwrap_or_default().is_empty());
            assert!(!value["description"].as_str().unwrap_or_default().is_empty());
            assert_eq!(value["inputSchema"]["type"], "object");
        }
    }

    #[test]
    fn register_schema_mirrors_validation_rules() {
        let tools = tool_definitions();
        let register = tools
            .iter()
            .find(|tool| tool.name == ToolName::RegisterUser)
            .expect("register_user is registered");
        let username = &register.input_schema["properties"]["username"];
        assert_eq!(username["minLength"], 3);
        assert_eq!(username["maxLength"], 50);
        assert_eq!(username["pattern"], USERNAME_PATTERN);
    }

    #[test]
    fn zero_parameter_tools_accept_empty_object() {
        let empty = Map::new();
        assert_eq!(
            ToolCall::from_args(ToolName::HealthCheck, &empty),
            Ok(ToolCall::HealthCheck)
        );
        assert_eq!(
            ToolCall::from_args(ToolName::RotateApiKey, &empty),
            Ok(ToolCall::RotateApiKey)
        );
        assert_eq!(
            ToolCall::from_args(ToolName::GetApiKeyStatus, &empty),
            Ok(ToolCall::GetApiKeyStatus)
        );
    }

    #[test]
    fn register_user_validates_both_fields() {
        let ok = ToolCall::from_args(
            ToolName::RegisterUser,
            &args(json!({ "username": "abc", "password": "hunter22" })),
        );
        assert!(matches!(ok, Ok(ToolCall::RegisterUser(_))));

        let err = ToolCall::from_args(
            ToolName::RegisterUser,
            &args(json!({ "username": "a!b", "password": "hunter22" })),
        )
        .unwrap_err();
        assert_eq!(err.field(), "username");

        let err = ToolCall::from_args(
            ToolName::RegisterUser,
            &args(json!({ "username": "abc", "password": "short" })),
        )
        .unwrap_err();
        assert_eq!(err.field(), "password");
    }

    #[test]
    fn create_dataset_data_is_optional() {
        let call = ToolCall::from_args(ToolName::CreateDataset, &args(json!({ "name": "sales" })))
            .unwrap();
        let ToolCall::CreateDataset(input) = call else {
            panic!("expected create_dataset call");
        };
        assert_eq!(input.data, None);
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({ "name": "sales" }));
    }

    #[test]
    fn update_dataset_requires_data_key() {
        let err = ToolCall::from_args(
            ToolName::UpdateDataset,
            &args(json!({ "dataset_id": "42" })),
        )
        .unwrap_err();
        assert_eq!(err.field(), "data");

        let ok = ToolCall::from_args(
            ToolName::UpdateDataset,
            &args(json!({ "dataset_id": "42", "data": null })),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn public_dataset_requires_owner_and_id() {
        let err = ToolCall::from_args(
            ToolName::GetPublicDataset,
            &args(json!({ "username": "alice" })),
        )
        .unwrap_err();
        assert_eq!(err.field(), "dataset_id");
    }

    #[test]
    fn only_write_tools_require_auth() {
        let auth: Vec<ToolName> = ToolName::ALL
            .into_iter()
            .filter(|tool| tool.requires_auth())
            .collect();
        assert_eq!(
            auth,
            vec![
                ToolName::RotateApiKey,
                ToolName::CreateDataset,
                ToolName::UpdateDataset
            ]
        );
    }
}
