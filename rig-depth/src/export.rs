use nalgebra::{Point3, Vector3};
use ply_rs::{
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::io::Write;

/// Writes a point cloud as OBJ text, one `v x y z` line per point.
pub fn write_obj(mut writer: impl Write, points: &[Point3<f64>]) -> std::io::Result<()> {
    writeln!(writer, "# OBJ file")?;
    for point in points {
        writeln!(writer, "v {:.4} {:.4} {:.4}", point.x, point.y, point.z)?;
    }
    Ok(())
}

/// Writes a point cloud as ASCII PLY, carrying per-point normals when the
/// external estimator supplied them.
///
/// When `normals` is given it must be index-aligned with `points`.
pub fn write_ply(
    mut writer: impl Write,
    points: &[Point3<f64>],
    normals: Option<&[Vector3<f64>]>,
) -> std::io::Result<()> {
    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;

    let mut point_element = ElementDef::new("vertex".to_string());
    for name in ["x", "y", "z"] {
        let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double));
        point_element.properties.add(p);
    }
    if normals.is_some() {
        for name in ["nx", "ny", "nz"] {
            let p = PropertyDef::new(name.to_string(), PropertyType::Scalar(ScalarType::Double));
            point_element.properties.add(p);
        }
    }
    ply.header.elements.add(point_element);

    let mut vertices: Vec<DefaultElement> = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let mut vertex = DefaultElement::new();
        vertex.insert("x".to_string(), Property::Double(point.x));
        vertex.insert("y".to_string(), Property::Double(point.y));
        vertex.insert("z".to_string(), Property::Double(point.z));
        if let Some(normals) = normals {
            let normal = normals[i];
            vertex.insert("nx".to_string(), Property::Double(normal.x));
            vertex.insert("ny".to_string(), Property::Double(normal.y));
            vertex.insert("nz".to_string(), Property::Double(normal.z));
        }
        vertices.push(vertex);
    }
    ply.payload.insert("vertex".to_string(), vertices);

    let w = Writer::new();
    w.write_ply(&mut writer, &mut ply)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obj_lists_one_vertex_per_point() {
        let points = vec![
            Point3::new(0.0, 0.0, -0.001),
            Point3::new(1.25, -2.5, 3.0),
        ];
        let mut buffer = Vec::new();
        write_obj(&mut buffer, &points).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "v 0.0000 0.0000 -0.0010");
        assert_eq!(lines[2], "v 1.2500 -2.5000 3.0000");
    }

    #[test]
    fn ply_header_declares_normals_only_when_present() {
        let points = vec![Point3::new(1.0, 2.0, 3.0)];
        let normals = vec![Vector3::new(0.0, 0.0, 1.0)];

        let mut bare = Vec::new();
        write_ply(&mut bare, &points, None).unwrap();
        let bare = String::from_utf8(bare).unwrap();
        assert!(bare.contains("element vertex 1"));
        assert!(!bare.contains("property double nx"));

        let mut with_normals = Vec::new();
        write_ply(&mut with_normals, &points, Some(&normals)).unwrap();
        let with_normals = String::from_utf8(with_normals).unwrap();
        assert!(with_normals.contains("property double nx"));
        let payload: Vec<f64> = with_normals
            .lines()
            .last()
            .unwrap()
            .split_whitespace()
            .map(|field| field.parse().unwrap())
            .collect();
        assert_eq!(payload, vec![1.0, 2.0, 3.0, 0.0, 0.0, 1.0]);
    }
}
