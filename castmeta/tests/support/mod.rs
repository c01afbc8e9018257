//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use castcontrol::{ControlError, DeviceControl, DeviceId, DeviceStatus, PlayerState};
use std::collections::HashMap;
use std::sync::Mutex;

enum StatusBehavior {
    Status(DeviceStatus),
    Failing,
}

/// Scriptable device-control binding.
///
/// Devices without a configured status report as not found; playback
/// commands are recorded for assertions.
#[derive(Default)]
pub struct FakeDeviceControl {
    statuses: Mutex<HashMap<DeviceId, StatusBehavior>>,
    played: Mutex<Vec<(DeviceId, String)>>,
    stopped: Mutex<Vec<DeviceId>>,
    reject_play: Mutex<bool>,
}

impl FakeDeviceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, device: &DeviceId, is_idle: bool, player_state: PlayerState) {
        self.statuses.lock().unwrap().insert(
            device.clone(),
            StatusBehavior::Status(DeviceStatus {
                is_idle,
                player_state,
            }),
        );
    }

    pub fn set_status_failing(&self, device: &DeviceId) {
        self.statuses
            .lock()
            .unwrap()
            .insert(device.clone(), StatusBehavior::Failing);
    }

    pub fn reject_play(&self) {
        *self.reject_play.lock().unwrap() = true;
    }

    pub fn played(&self) -> Vec<(DeviceId, String)> {
        self.played.lock().unwrap().clone()
    }

    pub fn stopped(&self) -> Vec<DeviceId> {
        self.stopped.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceControl for FakeDeviceControl {
    async fn get_status(&self, device: &DeviceId) -> castcontrol::Result<DeviceStatus> {
        match self.statuses.lock().unwrap().get(device) {
            Some(StatusBehavior::Status(status)) => Ok(status.clone()),
            Some(StatusBehavior::Failing) => Err(ControlError::backend("status query failed")),
            None => Err(ControlError::DeviceNotFound(device.clone())),
        }
    }

    async fn play_url(
        &self,
        device: &DeviceId,
        url: &str,
        _title: Option<&str>,
    ) -> castcontrol::Result<()> {
        if *self.reject_play.lock().unwrap() {
            return Err(ControlError::backend("device rejected the media"));
        }
        self.played
            .lock()
            .unwrap()
            .push((device.clone(), url.to_string()));
        Ok(())
    }

    async fn stop(&self, device: &DeviceId) -> castcontrol::Result<()> {
        self.stopped.lock().unwrap().push(device.clone());
        Ok(())
    }
}
