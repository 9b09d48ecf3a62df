use crate::session::Client;
use crate::soap::{Element, ManagedObjectReference, Transport, XmlBuf};

use bon::Builder;

// Error Handling
use log::trace;
use miette::Result;
use vcprov_error::VcprovError;

/**
* What to read from the property collector.
* Starting at `obj`, optionally one level down through Folder.childEntity,
* keep the objects of type `kind` and read the properties in `path_set`.
*/
#[derive(Debug, Clone, Builder)]
pub struct PropertyFilter {
    pub obj: ManagedObjectReference,
    #[builder(into)]
    pub kind: String,
    #[builder(default)]
    pub path_set: Vec<String>,
    /// Do not report the starting object itself.
    #[builder(default)]
    pub skip: bool,
    /// Also visit the folder children of the starting object.
    #[builder(default)]
    pub traverse_children: bool,
}

impl PropertyFilter {
    pub fn write_xml(&self, w: &mut XmlBuf) {
        w.open("specSet");

        w.open("propSet").text("type", &self.kind);
        for path in &self.path_set {
            w.text("pathSet", path);
        }
        w.close("propSet");

        w.open("objectSet")
            .reference("obj", &self.obj)
            .text("skip", self.skip);
        if self.traverse_children {
            w.open_typed("selectSet", "TraversalSpec")
                .text("name", "traverseChildren")
                .text("type", "Folder")
                .text("path", "childEntity")
                .text("skip", false)
                .close("selectSet");
        }
        w.close("objectSet");

        w.close("specSet");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicProperty {
    pub name: String,
    pub val: Element,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContent {
    pub obj: ManagedObjectReference,
    pub prop_set: Vec<DynamicProperty>,
}

impl ObjectContent {
    pub fn from_element(element: &Element) -> Result<Self, VcprovError> {
        let obj = ManagedObjectReference::from_element(element.required_child("obj")?)?;
        let mut prop_set = vec![];
        for prop in element.children_named("propSet") {
            prop_set.push(DynamicProperty {
                name: prop.required_text("name")?.to_owned(),
                val: prop.required_child("val")?.to_owned(),
            });
        }
        Ok(Self { obj, prop_set })
    }
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.prop_set.iter().find(|p| p.name == name).map(|p| &p.val)
    }
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).map(|e| e.text.as_str())
    }
    pub fn reference(&self, name: &str) -> Option<ManagedObjectReference> {
        self.get(name)
            .and_then(|e| ManagedObjectReference::from_element(e).ok())
    }
}

/**
* RetrievePropertiesEx, then ContinueRetrievePropertiesEx
* as long as the collector hands back a continuation token.
*/
pub async fn retrieve<T: Transport>(
    client: &Client<T>,
    filter: &PropertyFilter,
) -> Result<Vec<ObjectContent>, VcprovError> {
    let collector = client.service_content.property_collector.clone();

    let mut args = XmlBuf::new();
    filter.write_xml(&mut args);
    args.open("options").close("options");
    let response = client.call("RetrievePropertiesEx", &collector, &args).await?;

    let mut objects = vec![];
    let mut token = collect(&response, &mut objects)?;
    while let Some(value) = token {
        trace!("continue property retrieval with token {}", value);
        let mut args = XmlBuf::new();
        args.text("token", &value);
        let response = client
            .call("ContinueRetrievePropertiesEx", &collector, &args)
            .await?;
        token = collect(&response, &mut objects)?;
    }
    Ok(objects)
}

/// Append a RetrieveResult objects and return its continuation token.
fn collect(response: &Element, objects: &mut Vec<ObjectContent>) -> Result<Option<String>, VcprovError> {
    // An empty result has no returnval at all.
    let result = match response.child("returnval") {
        Some(result) => result,
        None => return Ok(None),
    };
    for object in result.children_named("objects") {
        objects.push(ObjectContent::from_element(object)?);
    }
    Ok(result
        .child_text("token")
        .filter(|e| !e.is_empty())
        .map(|e| e.to_owned()))
}
