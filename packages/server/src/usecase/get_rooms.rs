//! UseCase: 接続中のルーム一覧取得（デバッグ用）

use std::sync::Arc;

use crate::domain::{ConnectionRegistry, RoomSnapshot};

pub struct GetRoomsUseCase {
    registry: Arc<dyn ConnectionRegistry>,
}

impl GetRoomsUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(&self) -> Vec<RoomSnapshot> {
        self.registry.rooms()
    }
}
