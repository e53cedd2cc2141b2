//! Scripted in-memory fabric used by the drain agent tests.

use fabric_port::{FabricError, FabricOperations, HostId, NodeId, RemoteService, Vm, VmId};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

/// ID of the host a vm lands on once the mock decides it has migrated.
const MIGRATED_HOST: &str = "host-migrated";

#[derive(Default)]
struct MockState {
    services: Vec<RemoteService>,
    list_services_failures: u32,
    list_services_calls: u32,
    scheduling_failures: u32,
    scheduling_requests: Vec<(NodeId, String, bool)>,
    vms: Vec<Vm>,
    vm_enumeration_fails: bool,
    migration_scripts: HashMap<VmId, VecDeque<FabricError>>,
    migration_requests: Vec<(VmId, bool)>,
    get_vm_failures: HashMap<VmId, u32>,
    get_vm_calls: HashMap<VmId, u32>,
    successful_polls: HashMap<VmId, u32>,
    polls_to_migrate: HashMap<VmId, u32>,
}

/// A scripted `FabricOperations` implementation: serves canned snapshots,
/// fails a configured number of times per operation and flips a vm's host
/// after a configured number of polls.
#[derive(Default)]
pub(crate) struct MockFabric {
    state: Mutex<MockState>,
}

impl MockFabric {
    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn with_service(self, host: &str, binary: &str, status: &str) -> Self {
        self.state.lock().unwrap().services.push(RemoteService {
            status: status.to_string(),
            binary: binary.to_string(),
            host: host.to_string(),
            zone: "default".to_string(),
            state: "up".to_string(),
            id: "1".to_string(),
        });
        self
    }

    /// Fail the first `failures` calls to `list_services`.
    pub(crate) fn with_list_services_failures(self, failures: u32) -> Self {
        self.state.lock().unwrap().list_services_failures = failures;
        self
    }

    /// Fail the first `failures` calls to `set_node_scheduling`.
    pub(crate) fn with_set_scheduling_failures(self, failures: u32) -> Self {
        self.state.lock().unwrap().scheduling_failures = failures;
        self
    }

    pub(crate) fn with_vm(self, vm: Vm) -> Self {
        self.state.lock().unwrap().vms.push(vm);
        self
    }

    pub(crate) fn with_vm_enumeration_failure(self) -> Self {
        self.state.lock().unwrap().vm_enumeration_fails = true;
        self
    }

    /// Script the responses of consecutive `request_live_migration` calls
    /// for a vm; once the script runs out the request is accepted.
    pub(crate) fn with_migration_script(
        self,
        vm_id: impl Into<VmId>,
        rejections: Vec<FabricError>,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .migration_scripts
            .insert(vm_id.into(), rejections.into());
        self
    }

    /// Flip the vm's host after `polls` successful `get_vm` calls still
    /// showing the original placement. Unscripted vms never move.
    pub(crate) fn with_polls_to_migrate(self, vm_id: impl Into<VmId>, polls: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .polls_to_migrate
            .insert(vm_id.into(), polls);
        self
    }

    /// Fail the first `failures` calls to `get_vm` for the given vm.
    pub(crate) fn with_get_vm_failures(self, vm_id: impl Into<VmId>, failures: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .get_vm_failures
            .insert(vm_id.into(), failures);
        self
    }

    pub(crate) fn list_services_calls(&self) -> u32 {
        self.state.lock().unwrap().list_services_calls
    }

    pub(crate) fn scheduling_requests(&self) -> Vec<(NodeId, String, bool)> {
        self.state.lock().unwrap().scheduling_requests.clone()
    }

    pub(crate) fn migration_requests(&self) -> Vec<(VmId, bool)> {
        self.state.lock().unwrap().migration_requests.clone()
    }

    pub(crate) fn get_vm_calls(&self, vm_id: &VmId) -> u32 {
        self.state
            .lock()
            .unwrap()
            .get_vm_calls
            .get(vm_id)
            .copied()
            .unwrap_or(0)
    }

    fn scripted_failure(request: &str) -> FabricError {
        FabricError::Request {
            request: request.to_string(),
            reason: "scripted failure".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl FabricOperations for MockFabric {
    async fn list_services(&self) -> Result<Vec<RemoteService>, FabricError> {
        let mut state = self.state.lock().unwrap();
        state.list_services_calls += 1;
        if state.list_services_failures > 0 {
            state.list_services_failures -= 1;
            return Err(Self::scripted_failure("list_services"));
        }
        Ok(state.services.clone())
    }

    async fn set_node_scheduling(
        &self,
        node_id: &NodeId,
        binary: &str,
        enable: bool,
    ) -> Result<(), FabricError> {
        let mut state = self.state.lock().unwrap();
        state
            .scheduling_requests
            .push((node_id.clone(), binary.to_string(), enable));
        if state.scheduling_failures > 0 {
            state.scheduling_failures -= 1;
            return Err(Self::scripted_failure("set_node_scheduling"));
        }
        Ok(())
    }

    async fn list_vms_on_host(&self, _node_id: &NodeId) -> Result<Vec<Vm>, FabricError> {
        let state = self.state.lock().unwrap();
        if state.vm_enumeration_fails {
            return Err(Self::scripted_failure("list_vms_on_host"));
        }
        Ok(state.vms.clone())
    }

    async fn request_live_migration(
        &self,
        vm_id: &VmId,
        block_migration: bool,
    ) -> Result<(), FabricError> {
        let mut state = self.state.lock().unwrap();
        state
            .migration_requests
            .push((vm_id.clone(), block_migration));
        match state.migration_scripts.get_mut(vm_id) {
            Some(script) => match script.pop_front() {
                Some(rejection) => Err(rejection),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    async fn get_vm(&self, vm_id: &VmId) -> Result<Vm, FabricError> {
        let mut state = self.state.lock().unwrap();
        *state.get_vm_calls.entry(vm_id.clone()).or_default() += 1;
        if let Some(failures) = state.get_vm_failures.get_mut(vm_id) {
            if *failures > 0 {
                *failures -= 1;
                return Err(Self::scripted_failure("get_vm"));
            }
        }
        let vm = state
            .vms
            .iter()
            .find(|vm| &vm.id == vm_id)
            .cloned()
            .ok_or(FabricError::VmNotFound {
                vm_id: vm_id.clone(),
            })?;
        let polls = state.successful_polls.entry(vm_id.clone()).or_default();
        *polls += 1;
        let polls = *polls;
        match state.polls_to_migrate.get(vm_id) {
            Some(threshold) if polls > *threshold => Ok(Vm {
                host_id: HostId::from(MIGRATED_HOST),
                ..vm
            }),
            _ => Ok(vm),
        }
    }
}
