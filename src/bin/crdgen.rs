//! # CRD Generator
//!
//! Prints the CustomResourceDefinition YAML for every kind the operator manages.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/serviceintegration.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use managed_service_operator::crd::ServiceIntegration;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&ServiceIntegration::crd())?);
    Ok(())
}
