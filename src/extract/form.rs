use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::{
    FlowfrontError, Result,
    model::{WorkflowModel, node_types},
    transform::{find_trigger, webhook_field_name},
};

fn default_field_type() -> String {
    "text".to_string()
}

/// One entry of a form trigger's `formFields.values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub field_label: String,
    #[serde(default = "default_field_type")]
    pub field_type: String,
    #[serde(default)]
    pub required_field: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_files: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_file_types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_options: Option<FieldOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default)]
    pub values: Vec<FieldOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub option: String,
}

impl FormField {
    /// Key under which this field arrives in a webhook body.
    pub fn webhook_key(&self) -> String {
        webhook_field_name(&self.field_label)
    }

    /// Choices of a dropdown field, in declared order.
    pub fn options(&self) -> Vec<&str> {
        self.field_options.as_ref().map(|o| o.values.iter().map(|v| v.option.as_str()).collect()).unwrap_or_default()
    }

    pub fn is_file(&self) -> bool {
        self.field_type == "file"
    }

    /// Read `formFields.values` from trigger parameters. `None` when the list is
    /// absent. Entries without a label (custom html, hidden fields) are skipped.
    pub fn list_from_parameters(parameters: &Value) -> Option<Vec<FormField>> {
        let values = parameters.get("formFields")?.get("values")?.as_array()?;
        let fields = values
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<FormField>(entry.clone()) {
                Ok(field) if !field.field_label.trim().is_empty() => Some(field),
                Ok(_) => {
                    warn!(index, "form field with an empty label is skipped");
                    None
                }
                Err(e) => {
                    warn!(index, error = %e, "form field without a usable label is skipped");
                    None
                }
            })
            .collect();
        Some(fields)
    }
}

/// What a form front end needs to render and submit the trigger's form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    pub form_title: String,
    #[serde(default)]
    pub form_description: String,
    pub form_fields: Vec<FormField>,
}

impl FormSettings {
    /// Project the workflow's form trigger.
    ///
    /// `Ok(None)` when the workflow has no form trigger; `UnexpectedShape` when the
    /// trigger is missing its title or field list.
    pub fn extract(workflow: &WorkflowModel) -> Result<Option<FormSettings>> {
        let Some(trigger) = find_trigger(&workflow.nodes, node_types::FORM_TRIGGER) else {
            return Ok(None);
        };
        let params = trigger.parameters();

        let form_title = params.get("formTitle").and_then(Value::as_str).filter(|s| !s.is_empty());
        let form_fields = FormField::list_from_parameters(params);
        let (Some(form_title), Some(form_fields)) = (form_title, form_fields) else {
            warn!(trigger = %trigger.name(), "form trigger without formTitle or formFields.values");
            return Err(FlowfrontError::UnexpectedShape(format!("form trigger '{}' needs formTitle and formFields.values", trigger.name())));
        };

        Ok(Some(FormSettings {
            form_title: form_title.to_string(),
            form_description: params.get("formDescription").and_then(Value::as_str).unwrap_or_default().to_string(),
            form_fields,
        }))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FormField> {
        self.form_fields.iter().filter(|field| field.required_field)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn form_workflow(parameters: Value) -> WorkflowModel {
        WorkflowModel::from_value(json!({
            "name": "Contact",
            "nodes": [{ "id": "t", "name": "On form submission", "type": "n8n-nodes-base.formTrigger", "parameters": parameters }],
            "connections": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_extract_form_settings() {
        let workflow = form_workflow(json!({
            "formTitle": "Contact us",
            "formDescription": "We answer within a day",
            "formFields": { "values": [
                { "fieldLabel": "Full Name", "requiredField": true, "placeholder": "Jane Doe" },
                { "fieldLabel": "Topic", "fieldType": "dropdown", "fieldOptions": { "values": [{ "option": "Sales" }, { "option": "Support" }] } },
                { "fieldLabel": "Attachment", "fieldType": "file", "multipleFiles": false, "acceptFileTypes": ".pdf,.png" }
            ] }
        }));
        let settings = FormSettings::extract(&workflow).unwrap().unwrap();

        assert_eq!(settings.form_title, "Contact us");
        assert_eq!(settings.form_description, "We answer within a day");
        assert_eq!(settings.form_fields.len(), 3);
        assert_eq!(settings.form_fields[0].field_type, "text");
        assert_eq!(settings.form_fields[0].webhook_key(), "Full_Name");
        assert_eq!(settings.form_fields[1].options(), vec!["Sales", "Support"]);
        assert!(settings.form_fields[2].is_file());
        assert_eq!(settings.form_fields[2].accept_file_types.as_deref(), Some(".pdf,.png"));
        assert_eq!(settings.required_fields().count(), 1);
    }

    #[test]
    fn test_extract_without_description() {
        let workflow = form_workflow(json!({ "formTitle": "T", "formFields": { "values": [] } }));
        let settings = FormSettings::extract(&workflow).unwrap().unwrap();
        assert_eq!(settings.form_description, "");
        assert!(settings.form_fields.is_empty());
    }

    #[test]
    fn test_extract_unexpected_shape() {
        let workflow = form_workflow(json!({ "formTitle": "T" }));
        assert!(matches!(FormSettings::extract(&workflow), Err(FlowfrontError::UnexpectedShape(_))));

        let workflow = form_workflow(json!({ "formFields": { "values": [] } }));
        assert!(matches!(FormSettings::extract(&workflow), Err(FlowfrontError::UnexpectedShape(_))));
    }

    #[test]
    fn test_extract_without_form_trigger() {
        let workflow = WorkflowModel::new("empty");
        assert_eq!(FormSettings::extract(&workflow).unwrap(), None);
    }

    #[test]
    fn test_list_from_parameters() {
        assert!(FormField::list_from_parameters(&json!({})).is_none());
        assert!(FormField::list_from_parameters(&json!({ "formFields": {} })).is_none());
        let fields = FormField::list_from_parameters(&json!({ "formFields": { "values": [{ "fieldLabel": "E mail" }] } })).unwrap();
        assert_eq!(fields[0].field_label, "E mail");
    }

    #[test]
    fn test_list_skips_unlabelled_entries() {
        let fields = FormField::list_from_parameters(&json!({ "formFields": { "values": [
            { "fieldLabel": "Full Name" },
            { "fieldType": "html", "html": "<p/>" },
            { "fieldLabel": "  ", "fieldType": "hiddenField" },
            { "fieldLabel": "Email", "fieldType": "email" }
        ] } }))
        .unwrap();
        assert_eq!(fields.iter().map(|f| f.field_label.as_str()).collect::<Vec<_>>(), vec!["Full Name", "Email"]);

        let fields = FormField::list_from_parameters(&json!({ "formFields": { "values": [{ "fieldType": "text" }] } })).unwrap();
        assert!(fields.is_empty());
    }
}
