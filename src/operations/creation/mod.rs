mod make_box;
mod make_compound;
mod make_edge;
mod make_face;
mod make_solid;
mod make_wire;

pub use make_box::MakeBox;
pub use make_compound::MakeCompound;
pub use make_edge::MakeEdge;
pub use make_face::MakeFace;
pub use make_solid::MakeSolid;
pub use make_wire::MakeWire;
