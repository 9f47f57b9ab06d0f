//! World-initialization payload for the `INIT_GAME` RPC.
//!
//! The contents are opaque to the transport; field order and widths are
//! fixed by the client and must be emitted exactly as below.

use crate::config::WorldConfig;
use crate::core::bitstream::BitStream;

/// Size of the trailing vehicle-model table.
const VEHICLE_TABLE_LEN: usize = 212;

/// Render the world-settings payload for one player.
#[must_use]
pub fn build_init_payload(world: &WorldConfig, hostname: &str, player_id: u16) -> Vec<u8> {
    let mut bs = BitStream::new();

    bs.write_bit(world.zone_names);
    bs.write_bit(world.cj_walk);
    bs.write_bit(world.allow_weapons);
    bs.write_bit(world.limit_global_chat);
    bs.write_f32(world.chat_radius);
    bs.write_bit(world.stunt_bonus);
    bs.write_f32(world.nametag_distance);
    bs.write_bit(world.disable_enter_exit);
    bs.write_bit(world.nametag_los);
    bs.write_bit(world.manual_vehicle_engine);
    bs.write_i32(world.spawns_available);
    bs.write_u16(player_id);
    bs.write_bit(world.show_player_tags);
    bs.write_i32(world.show_player_markers);
    bs.write_u8(world.world_time);
    bs.write_u8(world.weather);
    bs.write_f32(world.gravity);
    bs.write_bit(world.lan_mode);
    bs.write_i32(world.death_drop_money);
    bs.write_bit(world.instagib);

    bs.write_i32(world.onfoot_send_rate);
    bs.write_i32(world.incar_send_rate);
    bs.write_i32(world.firing_send_rate);
    bs.write_i32(world.send_multiplier);

    bs.write_u8(u8::from(world.lag_compensation));

    // Three unknown bytes the client expects before the hostname.
    bs.write_u8(0);
    bs.write_u8(0);
    bs.write_u8(0);

    bs.write_u8(hostname.len() as u8);
    bs.write_str(hostname);

    bs.write_bytes(&[1u8; VEHICLE_TABLE_LEN]);

    bs.into_bytes()
}
